use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;

use crate::database::models::{LeadSubmission, PublicLeadForm, SubmissionReceipt};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /public/:handle/form - visible fields and settings of a published form
pub async fn get(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult<PublicLeadForm> {
    let form = state.leads.public_form(&handle).await?;
    Ok(ApiResponse::success(form))
}

/// POST /public/:handle/leads - submit a lead
///
/// Honeypot hits get the same response as real submissions.
pub async fn submit(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    body: Result<Json<LeadSubmission>, JsonRejection>,
) -> ApiResult<SubmissionReceipt> {
    let Json(submission) = body?;
    let receipt = state.leads.submit_lead(&handle, submission).await?;
    Ok(ApiResponse::success(receipt))
}
