#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use linket_api::auth::{generate_jwt, Claims};
use linket_api::config::AppConfig;
use linket_api::database::Store;
use linket_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

/// Development config over a fresh in-memory store; no JWT secret, so every
/// owner route trusts the `accountId` it is given.
pub fn test_app() -> Router {
    app(AppState::new(AppConfig::development(), Store::memory()))
}

/// Same app, but owner routes require a bearer token signed with [`SECRET`].
pub fn secured_app() -> Router {
    let mut config = AppConfig::development();
    config.security.jwt_secret = Some(SECRET.to_string());
    app(AppState::new(config, Store::memory()))
}

pub fn token_for(account_id: &str, access: &str) -> String {
    generate_jwt(&Claims::new(account_id, access, 1), SECRET).expect("failed to sign test token")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }

    /// The `data` member of a success envelope.
    pub fn data(&self) -> Value {
        let body = self.json();
        assert_eq!(body["success"], Value::Bool(true), "expected success envelope, got {}", self.text);
        body["data"].clone()
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Result<TestResponse> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(TestResponse { status, headers, text: String::from_utf8_lossy(&bytes).into_owned() })
}

pub async fn get(app: &Router, uri: &str) -> Result<TestResponse> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> Result<TestResponse> {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> Result<TestResponse> {
    send(app, Method::PUT, uri, Some(body), None).await
}

pub async fn delete(app: &Router, uri: &str) -> Result<TestResponse> {
    send(app, Method::DELETE, uri, None, None).await
}

/// Profiles of an account, oldest first.
pub async fn profiles(app: &Router, account_id: &str) -> Result<Vec<Value>> {
    let res = get(app, &format!("/profiles?accountId={}", account_id)).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    Ok(res.data().as_array().cloned().unwrap_or_default())
}

pub fn active_ids(profiles: &[Value]) -> Vec<String> {
    profiles
        .iter()
        .filter(|p| p["is_active"] == Value::Bool(true))
        .filter_map(|p| p["id"].as_str().map(str::to_string))
        .collect()
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
}

impl TestServer {
    /// Serve a fresh development app on an unused port inside the current
    /// runtime.
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let router = test_app();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self { port, base_url };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}
