//! AI provider abstractions and implementations.
//!
//! A provider performs exactly one remote generation call. Retries and model
//! fallback live in [`crate::services::resilient`], so providers stay dumb and
//! are easy to replace with test doubles.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// HTTP status reported by the provider, if the call got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn describe(&self) -> ErrorDescription {
        ErrorDescription {
            status: self.status(),
            message: self.to_string(),
        }
    }
}

/// Normalized view of a failed call, used for retry classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription {
    pub status: Option<u16>,
    pub message: String,
}

/// One piece of request content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Base64-encoded bytes with their media type.
    InlineData { mime_type: String, data: String },
}

/// A single generation request against one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub contents: Vec<ContentPart>,
}

impl GenerationRequest {
    pub fn text(model: &str, prompt: &str, system_instruction: Option<&str>) -> Self {
        Self {
            model: model.to_string(),
            system_instruction: system_instruction
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
            contents: vec![ContentPart::Text(prompt.to_string())],
        }
    }
}

/// Result of a provider call. `text` may be absent or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: Option<String>,
    pub input_tokens: i32,
    pub output_tokens: i32,
}

/// A backend capable of a single content generation call.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Perform one generation call.
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
