//! Application startup and lifecycle management.

use crate::config::EdutoolConfig;
use crate::handlers::{
    analyze_image, delete_account, enhance_prompt, generate_tool, generation::MAX_IMAGE_BYTES,
    health_check, metrics_handler, readiness_check,
};
use crate::services::metrics::http_metrics_middleware;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::mock::MockProvider;
use crate::services::providers::GenerationProvider;
use crate::services::{
    AccountStore, Database, ResilientGenerator, RetryPolicy, SessionResolver,
    SignedCookieSessionResolver, ToolService,
};
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::Request,
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors::cors_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub tools: ToolService,
    /// `None` when no database is configured.
    pub accounts: Option<Arc<dyn AccountStore>>,
    pub sessions: Arc<dyn SessionResolver>,
}

impl FromRef<AppState> for Arc<dyn SessionResolver> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/account", delete(delete_account))
        .route("/api/prompts/enhance", post(enhance_prompt))
        .route("/api/tools/generate", post(generate_tool))
        .route(
            "/api/images/analyze",
            post(analyze_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .with_state(state)
        .layer(from_fn(http_metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(cors_middleware))
}

/// Pick the generation backend from configuration.
pub fn build_provider(config: &EdutoolConfig) -> Result<Arc<dyn GenerationProvider>, AppError> {
    if config.google.use_mock {
        tracing::warn!("GENAI_USE_MOCK is set, serving generations from the mock provider");
        return Ok(Arc::new(MockProvider::new(true)));
    }

    let provider = GeminiProvider::new(GeminiConfig::new(
        config.google.api_key.clone(),
        config.google.api_base.clone(),
    ))
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

    Ok(Arc::new(provider))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: EdutoolConfig) -> Result<Self, AppError> {
        let provider = build_provider(&config)?;
        let generator = ResilientGenerator::new(
            provider,
            config.models.candidates.clone(),
            RetryPolicy::from(config.retry),
        );
        tracing::info!(
            models = ?config.models.candidates,
            image_model = %config.models.image_model,
            max_retries = config.retry.max_retries,
            base_delay_ms = config.retry.base_delay_ms,
            "Initialized resilient generator"
        );

        let accounts: Option<Arc<dyn AccountStore>> = match &config.database.url {
            Some(url) => {
                let db = Database::new(url, config.database.max_connections)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to PostgreSQL: {}", e);
                        e
                    })?;
                db.run_migrations().await?;
                Some(Arc::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL is not set, account deletion is unavailable");
                None
            }
        };

        let state = AppState {
            tools: ToolService::new(generator, config.models.image_model.clone()),
            accounts,
            sessions: Arc::new(SignedCookieSessionResolver::new(
                config.session.secret.clone(),
                config.session.cookie_name.clone(),
            )),
        };

        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("edutool-service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the application until `shutdown` resolves.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
