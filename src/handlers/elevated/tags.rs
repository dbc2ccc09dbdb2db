use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::database::models::TagWithAssignment;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterTagRequest {
    #[serde(default)]
    pub chip_uid: String,
    #[serde(default)]
    pub claim_expires_at: Option<DateTime<Utc>>,
}

/// POST /admin/tags - provision an unclaimed tag and its claim code
pub async fn register(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<RegisterTagRequest>, JsonRejection>,
) -> ApiResult<TagWithAssignment> {
    caller.require_admin()?;
    let Json(request) = body?;
    let tag = state.tags.register_tag(&request.chip_uid, request.claim_expires_at).await?;
    Ok(ApiResponse::created(tag))
}
