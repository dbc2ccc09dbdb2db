use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /public/:handle/contact.vcf - downloadable contact card
pub async fn get(State(state): State<AppState>, Path(handle): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let (file_name, body) = state.vcards.public_vcard(&handle).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/vcard; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    ))
}
