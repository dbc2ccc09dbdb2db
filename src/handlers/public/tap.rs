use axum::extract::{Path, State};

use crate::database::models::TapResolution;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /t/:chip_uid - resolve an NFC tap to its profile page
pub async fn get(State(state): State<AppState>, Path(chip_uid): Path<String>) -> ApiResult<TapResolution> {
    let resolution = state.tags.resolve_tap(&chip_uid).await?;
    Ok(ApiResponse::success(resolution))
}
