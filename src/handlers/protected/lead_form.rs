use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    Json,
};
use serde_json::{json, Value};

use super::{owned_account, ScopeQuery};
use crate::database::models::{FieldPayload, LeadFormField, LeadFormSettings};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

/// GET /lead-form/fields?accountId=&handle= - all fields of the form, ordered
pub async fn fields_get(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult<Vec<LeadFormField>> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let fields = state.leads.list_fields(&account_id, &query.handle).await?;
    Ok(ApiResponse::success(fields))
}

/// PUT /lead-form/fields?accountId=&handle= - replace the whole field list
///
/// Body is the ordered array of fields. Keys are derived from labels when
/// missing and made unique.
pub async fn fields_put(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
    body: Result<Json<Vec<FieldPayload>>, JsonRejection>,
) -> ApiResult<Vec<LeadFormField>> {
    let Query(query) = query?;
    let Json(fields) = body?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let saved = state.leads.save_fields(&account_id, &query.handle, fields).await?;
    Ok(ApiResponse::success(saved))
}

/// DELETE /lead-form/fields/:key?accountId=&handle= - remove one field
pub async fn field_delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let deleted = state.leads.delete_field(&account_id, &query.handle, &key).await?;
    Ok(ApiResponse::success(json!({ "key": key, "deleted": deleted })))
}

/// GET /lead-form/settings?accountId=&handle= - settings, defaults when unsaved
pub async fn settings_get(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult<LeadFormSettings> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let settings = state.leads.get_settings(&account_id, &query.handle).await?;
    Ok(ApiResponse::success(settings))
}

/// PUT /lead-form/settings?accountId=&handle=
pub async fn settings_put(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
    body: Result<Json<LeadFormSettings>, JsonRejection>,
) -> ApiResult<LeadFormSettings> {
    let Query(query) = query?;
    let Json(settings) = body?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let saved = state.leads.save_settings(&account_id, &query.handle, settings).await?;
    Ok(ApiResponse::success(saved))
}
