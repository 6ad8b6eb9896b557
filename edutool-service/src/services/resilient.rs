//! Resilient generation across a ranked list of models.
//!
//! Each model gets `max_retries + 1` attempts. Overload failures are retried
//! on the same model after an exponential backoff; anything else abandons the
//! model immediately. A success with empty text never reaches the caller.

use crate::config::RetryConfig;
use crate::services::metrics;
use crate::services::providers::{
    ErrorDescription, GenerationProvider, GenerationRequest, ProviderError,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Error type for generation calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Overload or unavailability; worth retrying.
    #[error("Model temporarily unavailable: {0}")]
    Transient(ProviderError),

    #[error("{0}")]
    NonTransient(ProviderError),

    #[error("No content generated")]
    EmptyGeneration,

    #[error("Generated content does not appear to be valid HTML")]
    InvalidGeneratedContent,

    #[error("All models failed after retries")]
    AllModelsFailed,
}

impl GenerationError {
    /// Classify a provider failure as transient or not.
    pub fn from_provider(err: ProviderError) -> Self {
        if is_transient(&err.describe()) {
            GenerationError::Transient(err)
        } else {
            GenerationError::NonTransient(err)
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InvalidRequest(_) => "invalid_request",
            GenerationError::Transient(_) => "transient",
            GenerationError::NonTransient(_) => "non_transient",
            GenerationError::EmptyGeneration => "empty",
            GenerationError::InvalidGeneratedContent => "invalid_content",
            GenerationError::AllModelsFailed => "all_models_failed",
        }
    }
}

/// Whether a failure signals temporary overload of the backend.
pub fn is_transient(error: &ErrorDescription) -> bool {
    error.status == Some(503)
        || error.message.contains("overloaded")
        || error.message.contains("UNAVAILABLE")
}

/// Retry bounds for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries per model, on top of the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retrying after the failed attempt with index `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(config.max_retries, config.base_delay())
    }
}

/// Generation client with retry and model fallback.
#[derive(Clone)]
pub struct ResilientGenerator {
    provider: Arc<dyn GenerationProvider>,
    models: Vec<String>,
    policy: RetryPolicy,
}

impl ResilientGenerator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        models: Vec<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            models,
            policy,
        }
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Generate with the configured retry policy.
    pub async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.generate_with(prompt, system_instruction, self.policy)
            .await
    }

    /// Generate text, walking the candidate models in order.
    ///
    /// Whatever fails the last attempt of the last model is returned as is.
    /// `AllModelsFailed` means the last model was abandoned early by a
    /// non-transient failure with retries still left.
    #[tracing::instrument(skip(self, prompt, system_instruction), fields(prompt_len = prompt.len()))]
    pub async fn generate_with(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        policy: RetryPolicy,
    ) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            ));
        }

        let last_model = self.models.len().saturating_sub(1);

        for (model_index, model) in self.models.iter().enumerate() {
            let request = GenerationRequest::text(model, prompt, system_instruction);

            for attempt in 0..=policy.max_retries {
                info!(model = %model, attempt = attempt + 1, "Attempting generation");

                let err = match self.attempt(&request).await {
                    Ok(text) => {
                        info!(
                            model = %model,
                            attempt = attempt + 1,
                            "Generation succeeded"
                        );
                        return Ok(text);
                    }
                    Err(err) => err,
                };

                warn!(
                    model = %model,
                    attempt = attempt + 1,
                    kind = err.kind(),
                    error = %err,
                    "Generation attempt failed"
                );

                if err.is_transient() && attempt < policy.max_retries {
                    let delay = policy.backoff(attempt);
                    info!(
                        model = %model,
                        delay_ms = delay.as_millis() as u64,
                        next_attempt = attempt + 2,
                        "Model overloaded, backing off"
                    );
                    metrics::record_backoff(model);
                    sleep(delay).await;
                    continue;
                }

                if model_index == last_model && attempt == policy.max_retries {
                    metrics::record_generation_failure(err.kind());
                    return Err(err);
                }

                if err.is_transient() {
                    info!(model = %model, "Max retries reached, trying next model");
                } else {
                    info!(model = %model, "Non-transient failure, trying next model");
                }
                break;
            }

            if model_index < last_model {
                metrics::record_fallback(model);
            }
        }

        metrics::record_generation_failure("all_models_failed");
        Err(GenerationError::AllModelsFailed)
    }

    /// One provider call, with empty text turned into a failure.
    async fn attempt(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let start = Instant::now();
        let result = self.provider.generate_content(request).await;
        metrics::record_provider_latency(
            self.provider.name(),
            &request.model,
            start.elapsed().as_secs_f64(),
        );

        let outcome = match result {
            Ok(response) => {
                metrics::record_tokens(
                    &request.model,
                    response.input_tokens,
                    response.output_tokens,
                );
                response
                    .text
                    .filter(|text| !text.is_empty())
                    .ok_or(GenerationError::EmptyGeneration)
            }
            Err(e) => Err(GenerationError::from_provider(e)),
        };

        let label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_attempt(&request.model, label);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::ScriptedProvider;

    fn generator(
        script: Vec<Result<crate::services::providers::GenerationResponse, ProviderError>>,
        models: &[&str],
        max_retries: u32,
        base_delay_ms: u64,
    ) -> (ResilientGenerator, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(script));
        let generator = ResilientGenerator::new(
            provider.clone(),
            models.iter().map(|m| m.to_string()).collect(),
            RetryPolicy::new(max_retries, Duration::from_millis(base_delay_ms)),
        );
        (generator, provider)
    }

    fn description(status: Option<u16>, message: &str) -> ErrorDescription {
        ErrorDescription {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_is_transient_patterns() {
        assert!(is_transient(&description(Some(503), "Service Unavailable")));
        assert!(is_transient(&description(None, "The model is overloaded.")));
        assert!(is_transient(&description(
            Some(500),
            r#"{"error":{"status":"UNAVAILABLE"}}"#
        )));
        assert!(!is_transient(&description(Some(429), "Resource exhausted")));
        assert!(!is_transient(&description(Some(400), "invalid argument")));
        assert!(!is_transient(&description(None, "service unavailable")));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_provider_errors_are_classified() {
        let overloaded = ProviderError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert!(GenerationError::from_provider(overloaded).is_transient());

        let network = ProviderError::NetworkError("connection reset".to_string());
        assert!(!GenerationError::from_provider(network).is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_has_no_delay() {
        let (generator, provider) = generator(vec![ScriptedProvider::text("hello")], &["a", "b"], 3, 1000);
        let start = tokio::time::Instant::now();

        let text = generator.generate("prompt", None).await.unwrap();

        assert_eq!(text, "hello");
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(provider.models_called(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_after_exhausting_transient_retries() {
        let (generator, provider) = generator(
            vec![
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
                ScriptedProvider::text("from b"),
            ],
            &["a", "b"],
            1,
            1000,
        );
        let start = tokio::time::Instant::now();

        let text = generator.generate("prompt", None).await.unwrap();

        assert_eq!(text, "from b");
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert_eq!(provider.models_called(), vec!["a", "a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_exponentially() {
        let (generator, provider) = generator(
            vec![
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
                ScriptedProvider::text("finally"),
            ],
            &["a"],
            3,
            100,
        );
        let start = tokio::time::Instant::now();

        let text = generator.generate("prompt", None).await.unwrap();

        assert_eq!(text, "finally");
        // 100 + 200 + 400
        assert_eq!(start.elapsed(), Duration::from_millis(700));
        assert_eq!(provider.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_resets_when_switching_models() {
        let (generator, provider) = generator(
            vec![
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
                ScriptedProvider::text("ok"),
            ],
            &["a", "b"],
            2,
            100,
        );
        let start = tokio::time::Instant::now();

        generator.generate("prompt", None).await.unwrap();

        // a: 100 + 200, b: 100
        assert_eq!(start.elapsed(), Duration::from_millis(400));
        assert_eq!(provider.models_called(), vec!["a", "a", "a", "b", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_moves_to_next_model_without_waiting() {
        let (generator, provider) = generator(
            vec![ScriptedProvider::empty(), ScriptedProvider::text("from b")],
            &["a", "b"],
            3,
            1000,
        );
        let start = tokio::time::Instant::now();

        let text = generator.generate("prompt", None).await.unwrap();

        assert_eq!(text, "from b");
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(provider.models_called(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn whitespace_only_text_is_returned() {
        let (generator, provider) = generator(
            vec![ScriptedProvider::text("  \n "), ScriptedProvider::text("real")],
            &["a", "b"],
            0,
            1000,
        );

        assert_eq!(generator.generate("prompt", None).await.unwrap(), "  \n ");
        assert_eq!(provider.models_called(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_failure_skips_to_next_model() {
        let (generator, provider) = generator(
            vec![ScriptedProvider::bad_request(), ScriptedProvider::text("from b")],
            &["a", "b"],
            3,
            1000,
        );
        let start = tokio::time::Instant::now();

        let text = generator.generate("prompt", None).await.unwrap();

        assert_eq!(text, "from b");
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(provider.models_called(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_every_model_returns_last_transient_error() {
        let script = std::iter::repeat_with(ScriptedProvider::overloaded)
            .take(6)
            .collect();
        let (generator, provider) = generator(script, &["a", "b", "c"], 1, 10);

        let result = generator.generate("prompt", None).await;

        assert!(matches!(result, Err(GenerationError::Transient(_))));
        assert_eq!(
            provider.models_called(),
            vec!["a", "a", "b", "b", "c", "c"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_on_final_attempt_of_single_model_propagates() {
        let (generator, provider) = generator(
            vec![ScriptedProvider::overloaded(), ScriptedProvider::overloaded()],
            &["a"],
            1,
            1000,
        );

        let result = generator.generate("prompt", None).await;

        match result {
            Err(GenerationError::Transient(ProviderError::ApiError { status, .. })) => {
                assert_eq!(status, 503)
            }
            other => panic!("expected transient error, got {:?}", other),
        }
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_on_final_attempt_of_final_model_propagates() {
        let (generator, _provider) =
            generator(vec![ScriptedProvider::bad_request()], &["a"], 0, 1000);

        let result = generator.generate("prompt", None).await;

        assert_eq!(
            result,
            Err(GenerationError::NonTransient(ProviderError::ApiError {
                status: 400,
                message: "Request contains an invalid argument.".to_string(),
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_on_final_model_with_retries_left_is_aggregate() {
        let (generator, provider) =
            generator(vec![ScriptedProvider::bad_request()], &["a"], 2, 1000);

        let result = generator.generate("prompt", None).await;

        assert_eq!(result, Err(GenerationError::AllModelsFailed));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_on_final_attempt_of_final_model_propagates() {
        let (generator, _provider) =
            generator(vec![ScriptedProvider::empty()], &["a"], 0, 1000);

        let result = generator.generate("prompt", None).await;

        assert_eq!(result, Err(GenerationError::EmptyGeneration));
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_calls() {
        let (generator, provider) = generator(vec![], &["a"], 3, 1000);

        let result = generator.generate("   ", None).await;

        assert!(matches!(result, Err(GenerationError::InvalidRequest(_))));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn system_instruction_is_forwarded() {
        let (generator, provider) =
            generator(vec![ScriptedProvider::text("ok")], &["a"], 0, 1000);

        generator
            .generate("prompt", Some("You are an expert"))
            .await
            .unwrap();

        let calls = provider.calls();
        assert_eq!(
            calls[0].system_instruction.as_deref(),
            Some("You are an expert")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_policy_overrides_default() {
        let (generator, provider) = generator(
            vec![
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
                ScriptedProvider::overloaded(),
            ],
            &["a"],
            3,
            1000,
        );
        let start = tokio::time::Instant::now();

        let result = generator
            .generate_with("prompt", None, RetryPolicy::new(2, Duration::from_millis(500)))
            .await;

        assert!(matches!(result, Err(GenerationError::Transient(_))));
        // 500 + 1000
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
        assert_eq!(provider.calls().len(), 3);
    }
}
