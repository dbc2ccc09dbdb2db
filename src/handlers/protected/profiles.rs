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
use crate::database::models::{ProfilePayload, ProfileWithLinks};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub account_id: String,
    pub profile: ProfilePayload,
}

/// GET /profiles?accountId= - all profiles with links, oldest first
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> ApiResult<Vec<ProfileWithLinks>> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let profiles = state.profiles.list_profiles(&account_id).await?;
    Ok(ApiResponse::success(profiles))
}

/// POST /profiles - create or fully replace a profile and its links
///
/// Body: `{ "accountId": "...", "profile": { "id"?, "name", "handle", "links": [...] } }`
pub async fn save(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<SaveProfileRequest>, JsonRejection>,
) -> ApiResult<ProfileWithLinks> {
    let Json(request) = body?;
    let account_id = owned_account(&caller, &request.account_id)?;
    let saved = state.profiles.save_profile(&account_id, request.profile).await?;
    Ok(ApiResponse::success(saved))
}

/// DELETE /profiles/:id?accountId= - delete a profile; missing ids are a no-op
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    state.profiles.delete_profile(&account_id, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /profiles/:id/activate?accountId= - make this the active profile
pub async fn activate(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> ApiResult<ProfileWithLinks> {
    let Path(id) = id?;
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let profile = state.profiles.set_active_profile(&account_id, id).await?;
    Ok(ApiResponse::success(profile))
}
