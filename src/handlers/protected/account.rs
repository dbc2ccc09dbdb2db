use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use super::{owned_account, AccountQuery};
use crate::database::models::{Account, AccountUpdate};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleQuery {
    #[serde(default)]
    pub user_id: String,
    pub preferred: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub user_id: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            avatar_url: account.avatar_url(),
            user_id: account.user_id,
            handle: account.username,
            display_name: account.display_name,
        }
    }
}

/// GET /account/handle?userId=&preferred= - resolve or synthesize the public handle
pub async fn handle(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<HandleQuery>, QueryRejection>,
) -> ApiResult<AccountView> {
    let Query(query) = query?;
    let account_id = owned_account(&caller, &query.user_id)?;
    let account = state.accounts.resolve_handle(&account_id, query.preferred.as_deref()).await?;
    Ok(ApiResponse::success(account.into()))
}

/// PUT /account?accountId= - update display name and avatar reference
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<AccountQuery>, QueryRejection>,
    body: Result<Json<AccountUpdate>, JsonRejection>,
) -> ApiResult<AccountView> {
    let Query(query) = query?;
    let Json(update) = body?;
    let account_id = owned_account(&caller, &query.account_id)?;
    let account = state.accounts.update_account(&account_id, update).await?;
    Ok(ApiResponse::success(account.into()))
}
