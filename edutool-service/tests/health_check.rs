//! Health, readiness and metrics endpoint tests.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{body_json, body_text, TestAppBuilder};
use edutool_service::services::metrics;
use service_core::middleware::tracing::REQUEST_ID_HEADER;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestAppBuilder::new().build();

    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "edutool-service");
}

#[tokio::test]
async fn readiness_reports_missing_database() {
    let app = TestAppBuilder::new().without_database().build();

    let response = app.send(get("/ready")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["database"], "not_configured");
    assert_eq!(body["provider"], "ok");
    assert_eq!(body["provider_name"], "scripted");
    assert_eq!(body["models"], serde_json::json!(["model-a", "model-b"]));
}

#[tokio::test]
async fn readiness_pings_configured_store() {
    let app = TestAppBuilder::new().build();

    let response = app.send(get("/ready")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["database"], "ok");
}

#[tokio::test]
async fn readiness_fails_when_provider_is_unreachable() {
    let app = TestAppBuilder::new().unhealthy_provider().build();

    let response = app.send(get("/ready")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["provider"], "error");
    assert_eq!(body["provider_name"], "scripted");
    assert_eq!(app.provider.calls().len(), 0);
}

#[tokio::test]
async fn metrics_are_exported() {
    metrics::init_metrics();
    let app = TestAppBuilder::new().build();

    app.send(get("/health")).await;
    let response = app.send(get("/metrics")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("http_requests_total"));
}
