use axum::extract::{rejection::QueryRejection, Extension, Query, State};
use serde::Deserialize;

use super::owned_account;
use crate::database::models::AnalyticsSummary;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub account_id: String,
    pub days: Option<u32>,
}

/// GET /analytics?accountId=&days= - daily tap/lead rollups
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> ApiResult<AnalyticsSummary> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let summary = state.analytics.summary(&account_id, query.days).await?;
    Ok(ApiResponse::success(summary))
}
