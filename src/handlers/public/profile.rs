use axum::extract::{rejection::QueryRejection, Path, Query, State};
use serde::Deserialize;

use crate::database::models::PublicProfile;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PublicProfileQuery {
    /// Profile handle to show instead of the active one
    pub profile: Option<String>,
}

/// GET /public/:handle - public profile page data
pub async fn get(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    query: Result<Query<PublicProfileQuery>, QueryRejection>,
) -> ApiResult<PublicProfile> {
    let Query(query) = query?;
    let page = state.profiles.public_profile(&handle, query.profile.as_deref()).await?;
    Ok(ApiResponse::success(page))
}
