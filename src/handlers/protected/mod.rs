// Owner handlers. Every request names its account with `accountId`, which
// must match the caller injected by `jwt_auth_middleware`.
pub mod account;
pub mod analytics;
pub mod lead_form;
pub mod leads;
pub mod profiles;
pub mod tags;
pub mod vcard;

use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::Caller;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    #[serde(default)]
    pub account_id: String,
}

/// Lead form scope: the account plus the public handle the form lives on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub handle: String,
}

/// Trimmed, non-empty account id the caller is allowed to act for.
pub fn owned_account(caller: &Caller, account_id: &str) -> Result<String, ApiError> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(ApiError::bad_request("accountId is required"));
    }
    caller.authorize(account_id)?;
    Ok(account_id.to_string())
}
