use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{owned_account, AccountQuery};
use crate::database::models::TagWithAssignment;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// `null` clears the binding so taps follow the active profile
    #[serde(default)]
    pub profile_id: Option<Uuid>,
}

/// GET /tags?accountId= - tags claimed by the account
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> ApiResult<Vec<TagWithAssignment>> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let tags = state.tags.list_tags(&account_id).await?;
    Ok(ApiResponse::success(tags))
}

/// POST /tags/claim?accountId= - claim by chip UID or claim code
pub async fn claim(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> ApiResult<TagWithAssignment> {
    let Query(query) = query?;
    let Json(request) = body?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let tag = state.tags.claim_tag(&account_id, &request.code).await?;
    Ok(ApiResponse::success(tag))
}

/// PUT /tags/:id/assignment?accountId= - bind the tag to a profile
pub async fn assign(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AccountQuery>, QueryRejection>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<TagWithAssignment> {
    let Path(id) = id?;
    let Query(query) = query?;
    let Json(request) = body?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let tag = state.tags.assign_tag(&account_id, id, request.profile_id).await?;
    Ok(ApiResponse::success(tag))
}

/// DELETE /tags/:id/assignment?accountId= - release the tag
pub async fn release(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    state.tags.release_tag(&account_id, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "released": true })))
}
