/// Common test utilities for integration tests
///
/// Builds the full router over an in-memory store, so no database is needed,
/// and offers small helpers for driving it:
/// - JSON request/response round trips
/// - Registering and logging in users

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use taskvault_api::app::{build_router, AppState};
use taskvault_api::config::Config;
use taskvault_shared::store::memory::MemoryStore;
use tower::Service as _;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "password123";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub config: Config,
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Creates a context with default configuration
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Creates a context with extra configuration variables
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let config = Config::from_vars(|key| {
            extra
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .or_else(|| match key {
                    "DATABASE_URL" => Some("postgresql://unused/test".to_string()),
                    "JWT_SECRET" => Some(TEST_SECRET.to_string()),
                    _ => None,
                })
        })
        .expect("test configuration");

        let state = AppState::new(Arc::new(MemoryStore::new()), config.clone());
        let app = build_router(state);

        TestContext { app, config }
    }

    /// Sends a request with an optional bearer token and JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send_request(builder.body(body).unwrap()).await
    }

    /// Sends a prebuilt request
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers a user, asserting success, and returns the response body
    pub async fn register(&self, username: &str, email: &str) -> Value {
        let response = self
            .send(
                "POST",
                "/register",
                None,
                Some(json!({
                    "username": username,
                    "email": email,
                    "password": TEST_PASSWORD,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Logs in, asserting success, and returns the bearer token
    pub async fn login(&self, identity: &str) -> String {
        let response = self
            .send(
                "POST",
                "/login",
                None,
                Some(json!({ "identity": identity, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// Registers and logs in a fresh user, returning its token
    pub async fn user_token(&self, username: &str) -> String {
        self.register(username, &format!("{}@example.com", username))
            .await;
        self.login(username).await
    }
}
