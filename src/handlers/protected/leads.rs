use axum::{
    extract::{rejection::QueryRejection, Extension, Query, State},
    http::header,
    response::IntoResponse,
};

use super::{owned_account, AccountQuery};
use crate::database::models::Lead;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

/// GET /leads?accountId= - captured leads, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> ApiResult<Vec<Lead>> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let leads = state.leads.list_leads(&account_id).await?;
    Ok(ApiResponse::success(leads))
}

/// GET /leads/export?accountId= - the same list as CSV
pub async fn export(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let csv = state.leads.export_csv(&account_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"leads.csv\""),
        ],
        csv,
    ))
}
