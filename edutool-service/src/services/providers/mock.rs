//! Mock provider implementations for local runs and testing.

use super::{
    ContentPart, GenerationProvider, GenerationRequest, GenerationResponse, ProviderError,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Mock provider that echoes the prompt back.
///
/// Requests with a system instruction get a fenced HTML snippet so the tool
/// generation path produces a valid document.
pub struct MockProvider {
    enabled: bool,
}

impl MockProvider {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock provider not enabled".to_string(),
            ));
        }

        let prompt = request
            .contents
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let text = if request.system_instruction.is_some() {
            format!(
                "```html\n<div class=\"mock-tool\">Mock tool for: {}</div>\n```",
                prompt
            )
        } else {
            format!("Mock response from {} for: {}", request.model, prompt)
        };

        Ok(GenerationResponse {
            text: Some(text),
            input_tokens: prompt.len() as i32 / 4,
            output_tokens: 10,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock provider not enabled".to_string(),
            ))
        }
    }
}

/// Provider that replays a fixed script of outcomes and records every request.
///
/// Once the script runs out, every further call fails with a non-transient
/// `InvalidRequest` error.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<GenerationResponse, ProviderError>>>,
    calls: Mutex<Vec<GenerationRequest>>,
    unhealthy: AtomicBool,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<GenerationResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            unhealthy: AtomicBool::new(false),
        }
    }

    /// Make every subsequent health check fail.
    pub fn fail_health_check(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }

    /// Successful response carrying `text`.
    pub fn text(text: &str) -> Result<GenerationResponse, ProviderError> {
        Ok(GenerationResponse {
            text: Some(text.to_string()),
            ..Default::default()
        })
    }

    /// Successful response without any text.
    pub fn empty() -> Result<GenerationResponse, ProviderError> {
        Ok(GenerationResponse::default())
    }

    /// The 503 overload failure Gemini returns under load.
    pub fn overloaded() -> Result<GenerationResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status: 503,
            message: r#"{"error":{"code":503,"message":"The model is overloaded. Please try again later.","status":"UNAVAILABLE"}}"#.to_string(),
        })
    }

    /// A failure that is not worth retrying.
    pub fn bad_request() -> Result<GenerationResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status: 400,
            message: "Request contains an invalid argument.".to_string(),
        })
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Models requested so far, in order.
    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::InvalidRequest(
                    "Scripted provider exhausted".to_string(),
                ))
            })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(ProviderError::NetworkError(
                "Scripted provider unreachable".to_string(),
            ));
        }
        Ok(())
    }
}
