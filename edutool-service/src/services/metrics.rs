//! Prometheus metrics for edutool-service.
//!
//! Provides HTTP, generation and account metrics for observability.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// HTTP metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Generation metrics
pub static GENAI_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_BACKOFF_WAITS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_MODEL_FALLBACKS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_FAILURES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Account / database metrics
pub static ACCOUNT_DELETIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static DB_OPERATION_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once; only the first call wins.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    let http_requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("Failed to create http_requests_total metric");

    let http_request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["method", "path"],
    )
    .expect("Failed to create http_request_duration_seconds metric");

    // outcome: success, transient, non_transient, empty
    let genai_attempts = IntCounterVec::new(
        Opts::new("genai_attempts_total", "Generation attempts by model and outcome"),
        &["model", "outcome"],
    )
    .expect("Failed to create genai_attempts_total metric");

    let genai_backoff_waits = IntCounterVec::new(
        Opts::new(
            "genai_backoff_waits_total",
            "Backoff waits before retrying the same model",
        ),
        &["model"],
    )
    .expect("Failed to create genai_backoff_waits_total metric");

    let genai_fallbacks = IntCounterVec::new(
        Opts::new(
            "genai_model_fallbacks_total",
            "Times a model was abandoned for the next candidate",
        ),
        &["from_model"],
    )
    .expect("Failed to create genai_model_fallbacks_total metric");

    let genai_failures = IntCounterVec::new(
        Opts::new(
            "genai_failures_total",
            "Generation calls that failed after every candidate",
        ),
        &["reason"],
    )
    .expect("Failed to create genai_failures_total metric");

    let genai_tokens = IntCounterVec::new(
        Opts::new("genai_tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output
    )
    .expect("Failed to create genai_tokens_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "genai_provider_latency_seconds",
            "AI provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )
    .expect("Failed to create genai_provider_latency_seconds metric");

    let account_deletions = IntCounterVec::new(
        Opts::new("account_deletions_total", "Account deletion requests"),
        &["status"],
    )
    .expect("Failed to create account_deletions_total metric");

    let db_duration = HistogramVec::new(
        HistogramOpts::new(
            "db_operation_duration_seconds",
            "Database operation duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation"],
    )
    .expect("Failed to create db_operation_duration_seconds metric");

    registry
        .register(Box::new(http_requests_total.clone()))
        .expect("Failed to register http_requests_total");
    registry
        .register(Box::new(http_request_duration.clone()))
        .expect("Failed to register http_request_duration_seconds");
    registry
        .register(Box::new(genai_attempts.clone()))
        .expect("Failed to register genai_attempts_total");
    registry
        .register(Box::new(genai_backoff_waits.clone()))
        .expect("Failed to register genai_backoff_waits_total");
    registry
        .register(Box::new(genai_fallbacks.clone()))
        .expect("Failed to register genai_model_fallbacks_total");
    registry
        .register(Box::new(genai_failures.clone()))
        .expect("Failed to register genai_failures_total");
    registry
        .register(Box::new(genai_tokens.clone()))
        .expect("Failed to register genai_tokens_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register genai_provider_latency_seconds");
    registry
        .register(Box::new(account_deletions.clone()))
        .expect("Failed to register account_deletions_total");
    registry
        .register(Box::new(db_duration.clone()))
        .expect("Failed to register db_operation_duration_seconds");

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(http_requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(http_request_duration);
    let _ = GENAI_ATTEMPTS_TOTAL.set(genai_attempts);
    let _ = GENAI_BACKOFF_WAITS_TOTAL.set(genai_backoff_waits);
    let _ = GENAI_MODEL_FALLBACKS_TOTAL.set(genai_fallbacks);
    let _ = GENAI_FAILURES_TOTAL.set(genai_failures);
    let _ = GENAI_TOKENS_TOTAL.set(genai_tokens);
    let _ = GENAI_PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = ACCOUNT_DELETIONS_TOTAL.set(account_deletions);
    let _ = DB_OPERATION_DURATION_SECONDS.set(db_duration);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

/// Record request count and latency, labelled by the matched route.
pub async fn http_metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[&method, &path, &status]).inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[&method, &path])
            .observe(start.elapsed().as_secs_f64());
    }

    response
}

// Helper functions for recording metrics

/// Record the outcome of one generation attempt.
pub fn record_attempt(model: &str, outcome: &str) {
    if let Some(counter) = GENAI_ATTEMPTS_TOTAL.get() {
        counter.with_label_values(&[model, outcome]).inc();
    }
}

/// Record a backoff wait before retrying `model`.
pub fn record_backoff(model: &str) {
    if let Some(counter) = GENAI_BACKOFF_WAITS_TOTAL.get() {
        counter.with_label_values(&[model]).inc();
    }
}

/// Record that `model` was abandoned for the next candidate.
pub fn record_fallback(model: &str) {
    if let Some(counter) = GENAI_MODEL_FALLBACKS_TOTAL.get() {
        counter.with_label_values(&[model]).inc();
    }
}

/// Record a terminal generation failure.
pub fn record_generation_failure(reason: &str) {
    if let Some(counter) = GENAI_FAILURES_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}

/// Record token usage.
pub fn record_tokens(model: &str, input_tokens: i32, output_tokens: i32) {
    if let Some(counter) = GENAI_TOKENS_TOTAL.get() {
        counter
            .with_label_values(&[model, "input"])
            .inc_by(input_tokens.max(0) as u64);
        counter
            .with_label_values(&[model, "output"])
            .inc_by(output_tokens.max(0) as u64);
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = GENAI_PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

/// Record an account deletion outcome.
pub fn record_account_deletion(status: &str) {
    if let Some(counter) = ACCOUNT_DELETIONS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}

/// Record database operation duration.
pub fn record_db_operation(operation: &str, duration_secs: f64) {
    if let Some(histogram) = DB_OPERATION_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}
