use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::services::metrics;
use crate::startup::AppState;

/// Liveness check.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "edutool-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness check. Pings the database when one is configured, then the
/// generation provider.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.accounts {
        None => "not_configured".to_string(),
        Some(store) => match store.health_check().await {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check failed");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "status": "unavailable",
                        "database": "error",
                        "error": e.to_string()
                    })),
                );
            }
        },
    };

    let provider = state.tools.generator().provider();
    if let Err(e) = provider.health_check().await {
        tracing::warn!(provider = provider.name(), error = %e, "Provider health check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "database": database,
                "provider": "error",
                "provider_name": provider.name(),
                "error": e.to_string()
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "database": database,
            "provider": "ok",
            "provider_name": provider.name(),
            "models": state.tools.generator().models()
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::get_metrics(),
    )
}
