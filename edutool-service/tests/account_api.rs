//! Account deletion endpoint tests against in-process test doubles.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{body_json, session_cookie, TestAppBuilder};
use serde_json::json;

fn delete_request(cookie: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::DELETE)
        .uri("/api/account")
        .header(header::ORIGIN, "https://edu.example.com");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn preflight_is_answered_with_cors_headers() {
    let app = TestAppBuilder::new().build();

    let response = app
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/account")
                .header(header::ORIGIN, "https://edu.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://edu.example.com"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization, Cookie"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn missing_session_is_rejected() {
    let app = TestAppBuilder::new().build();
    app.accounts().add_user("u1");

    let response = app.send(delete_request(None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://edu.example.com"
    );
    assert_eq!(body_json(response).await, json!({ "message": "Not authenticated" }));
    assert!(app.accounts().has_user("u1"));
}

#[tokio::test]
async fn forged_session_is_rejected() {
    let app = TestAppBuilder::new().build();

    let response = app
        .send(delete_request(Some("session=u1.deadbeef".to_string())))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_database_is_reported() {
    let app = TestAppBuilder::new().without_database().build();

    let response = app.send(delete_request(Some(session_cookie("u1")))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Database not configured" })
    );
}

#[tokio::test]
async fn deletes_all_user_rows_and_clears_cookie() {
    let app = TestAppBuilder::new().build();
    let store = app.accounts();
    store.add_user("u1");
    store.add_user("u2");
    store.add_rows("generation_requests", "u1", 4);
    store.add_rows("custom_tool_types", "u1", 1);
    store.add_rows("custom_categories", "u1", 2);
    store.add_rows("generation_requests", "u2", 1);

    let response = app.send(delete_request(Some(session_cookie("u1")))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::SET_COOKIE],
        "session=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0"
    );
    assert_eq!(
        body_json(response).await,
        json!({ "success": true, "message": "Account deleted successfully" })
    );

    assert!(!store.has_user("u1"));
    assert_eq!(store.row_count("generation_requests", "u1"), 0);
    assert_eq!(store.row_count("custom_tool_types", "u1"), 0);
    assert_eq!(store.row_count("custom_categories", "u1"), 0);

    assert!(store.has_user("u2"));
    assert_eq!(store.row_count("generation_requests", "u2"), 1);
}

#[tokio::test]
async fn storage_failure_is_generic_and_keeps_data() {
    let app = TestAppBuilder::new().build();
    let store = app.accounts();
    store.add_user("u1");
    store.add_rows("custom_categories", "u1", 3);
    store.fail_deletes();

    let response = app.send(delete_request(Some(session_cookie("u1")))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Failed to delete account" })
    );
    assert!(store.has_user("u1"));
    assert_eq!(store.row_count("custom_categories", "u1"), 3);
}
