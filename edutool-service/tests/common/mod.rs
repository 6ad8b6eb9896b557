//! Shared helpers for edutool-service integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use edutool_service::services::providers::mock::ScriptedProvider;
use edutool_service::services::providers::{GenerationResponse, ProviderError};
use edutool_service::services::{
    AccountStore, InMemoryAccountStore, ResilientGenerator, RetryPolicy,
    SignedCookieSessionResolver, ToolService,
};
use edutool_service::startup::{build_router, AppState};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const SESSION_SECRET: &str = "test-session-secret";
pub const MODELS: [&str; 2] = ["model-a", "model-b"];

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<ScriptedProvider>,
    pub accounts: Option<Arc<InMemoryAccountStore>>,
}

pub struct TestAppBuilder {
    script: Vec<Result<GenerationResponse, ProviderError>>,
    accounts: Option<Arc<InMemoryAccountStore>>,
    provider_unhealthy: bool,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            accounts: Some(Arc::new(InMemoryAccountStore::new())),
            provider_unhealthy: false,
        }
    }

    pub fn script(mut self, script: Vec<Result<GenerationResponse, ProviderError>>) -> Self {
        self.script = script;
        self
    }

    pub fn without_database(mut self) -> Self {
        self.accounts = None;
        self
    }

    pub fn unhealthy_provider(mut self) -> Self {
        self.provider_unhealthy = true;
        self
    }

    pub fn build(self) -> TestApp {
        let provider = Arc::new(ScriptedProvider::new(self.script));
        if self.provider_unhealthy {
            provider.fail_health_check();
        }
        let generator = ResilientGenerator::new(
            provider.clone(),
            MODELS.iter().map(|m| m.to_string()).collect(),
            RetryPolicy::new(1, Duration::from_millis(1)),
        );

        let state = AppState {
            tools: ToolService::new(generator, "vision-model"),
            accounts: self
                .accounts
                .clone()
                .map(|store| store as Arc<dyn AccountStore>),
            sessions: Arc::new(SignedCookieSessionResolver::new(SESSION_SECRET, "session")),
        };

        TestApp {
            router: build_router(state),
            provider,
            accounts: self.accounts,
        }
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub fn accounts(&self) -> &InMemoryAccountStore {
        self.accounts.as_deref().expect("test app has no account store")
    }
}

/// `Cookie` header value carrying a valid session for `user_id`.
pub fn session_cookie(user_id: &str) -> String {
    let token = SignedCookieSessionResolver::new(SESSION_SECRET, "session")
        .issue(user_id)
        .expect("signing never fails for a non-empty key");
    format!("session={}", token)
}

pub fn json_request(method: &str, uri: &str, user_id: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header(header::COOKIE, session_cookie(user_id));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn multipart_request(
    uri: &str,
    user_id: &str,
    field: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let boundary = "edutool-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::COOKIE, session_cookie(user_id))
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
