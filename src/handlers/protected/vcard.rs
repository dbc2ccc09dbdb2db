use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query, State,
    },
    Json,
};

use super::{owned_account, AccountQuery};
use crate::database::models::{VcardPayload, VcardProfile};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

/// GET /vcard?accountId= - saved contact card, `null` when none
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> ApiResult<Option<VcardProfile>> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let card = state.vcards.get_vcard(&account_id).await?;
    Ok(ApiResponse::success(card))
}

/// PUT /vcard?accountId=
pub async fn put(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
    body: Result<Json<VcardPayload>, JsonRejection>,
) -> ApiResult<VcardProfile> {
    let Query(query) = query?;
    let Json(payload) = body?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let saved = state.vcards.save_vcard(&account_id, payload).await?;
    Ok(ApiResponse::success(saved))
}
