//! Typed HTTP client for the owner API, plus the autosave adapter that
//! persists profile drafts through it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::autosave::{DraftSaver, ProfileDraft, SaveError};
use crate::database::models::{ProfilePayload, ProfileWithLinks};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with its error envelope.
    #[error("{message}")]
    Api { status: StatusCode, code: String, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Public handle as reported by `/account/handle`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountHandle {
    pub user_id: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            token: None,
        }
    }

    /// Bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> ClientResult<Value> {
        self.send(self.request(Method::GET, "/health")).await
    }

    pub async fn list_profiles(&self, account_id: &str) -> ClientResult<Vec<ProfileWithLinks>> {
        let req = self.request(Method::GET, "/profiles").query(&[("accountId", account_id)]);
        self.send(req).await
    }

    pub async fn save_profile(&self, account_id: &str, profile: &ProfilePayload) -> ClientResult<ProfileWithLinks> {
        let req = self
            .request(Method::POST, "/profiles")
            .json(&json!({ "accountId": account_id, "profile": profile }));
        self.send(req).await
    }

    pub async fn delete_profile(&self, account_id: &str, profile_id: Uuid) -> ClientResult<()> {
        let req = self
            .request(Method::DELETE, &format!("/profiles/{}", profile_id))
            .query(&[("accountId", account_id)]);
        self.send::<Value>(req).await.map(|_| ())
    }

    pub async fn activate_profile(&self, account_id: &str, profile_id: Uuid) -> ClientResult<ProfileWithLinks> {
        let req = self
            .request(Method::POST, &format!("/profiles/{}/activate", profile_id))
            .query(&[("accountId", account_id)]);
        self.send(req).await
    }

    pub async fn resolve_handle(&self, account_id: &str, preferred: Option<&str>) -> ClientResult<AccountHandle> {
        let mut query = vec![("userId", account_id)];
        if let Some(preferred) = preferred {
            query.push(("preferred", preferred));
        }
        let req = self.request(Method::GET, "/account/handle").query(&query);
        self.send(req).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let parsed: Option<ErrorBody> = serde_json::from_slice(&body).ok();
            let (code, message) = match parsed {
                Some(ErrorBody { message: Some(message), code }) => (code.unwrap_or_default(), message),
                _ => (
                    String::new(),
                    status.canonical_reason().unwrap_or("request failed").to_string(),
                ),
            };
            return Err(ClientError::Api { status, code, message });
        }

        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Saves profile drafts for one account.
#[derive(Clone)]
pub struct ProfileSaver {
    client: ApiClient,
    account_id: String,
}

impl ProfileSaver {
    pub fn new(client: ApiClient, account_id: impl Into<String>) -> Self {
        Self { client, account_id: account_id.into() }
    }
}

#[async_trait]
impl DraftSaver<ProfileDraft> for ProfileSaver {
    async fn save(&self, draft: ProfileDraft) -> Result<ProfileDraft, SaveError> {
        self.client
            .save_profile(&self.account_id, &draft.to_payload())
            .await
            .map(ProfileDraft::from)
            .map_err(|e| SaveError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let client = ApiClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn api_errors_display_the_server_message() {
        let err = ClientError::Api {
            status: StatusCode::CONFLICT,
            code: "CONFLICT".into(),
            message: "Handle 'jess' is already in use".into(),
        };
        assert_eq!(err.to_string(), "Handle 'jess' is already in use");
    }
}
