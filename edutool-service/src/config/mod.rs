use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_optional_env};
use service_core::error::AppError;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Default model candidates, most preferred first.
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-1.5-flash", "gemini-1.5-pro"];

const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct EdutoolConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub retry: RetryConfig,
    pub session: SessionConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Unset means account storage is unavailable.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub api_key: String,
    pub api_base: String,
    /// Serve generations from the mock provider instead of Gemini.
    pub use_mock: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Candidate models for text generation, most preferred first.
    pub candidates: Vec<String>,
    /// Model used for single-shot image analysis.
    pub image_model: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
}

impl EdutoolConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = common_config.is_prod();

        let candidates = parse_models(&get_env(
            "GENAI_MODELS",
            Some(&DEFAULT_MODELS.join(",")),
            is_prod,
        )?);
        if candidates.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GENAI_MODELS must name at least one model"
            )));
        }

        Ok(EdutoolConfig {
            common: common_config,
            database: DatabaseConfig {
                url: get_optional_env("DATABASE_URL"),
                max_connections: numeric_env(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_MAX_CONNECTIONS,
                    is_prod,
                )?,
            },
            google: GoogleConfig {
                api_key: get_env("GEMINI_API_KEY", None, is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_API_BASE), is_prod)?,
                use_mock: get_env("GENAI_USE_MOCK", Some("false"), is_prod)?
                    .eq_ignore_ascii_case("true"),
            },
            models: ModelConfig {
                candidates,
                image_model: get_env("GENAI_IMAGE_MODEL", Some(DEFAULT_IMAGE_MODEL), is_prod)?,
            },
            retry: RetryConfig {
                max_retries: numeric_env("GENAI_MAX_RETRIES", DEFAULT_MAX_RETRIES, is_prod)?,
                base_delay_ms: numeric_env(
                    "GENAI_BASE_DELAY_MS",
                    DEFAULT_BASE_DELAY_MS,
                    is_prod,
                )?,
            },
            session: SessionConfig {
                secret: get_env("SESSION_SECRET", None, is_prod)?,
                cookie_name: get_env("SESSION_COOKIE_NAME", Some("session"), is_prod)?,
            },
            observability: ObservabilityConfig {
                otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
                log_level: get_optional_env("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
        })
    }
}

/// Split a comma separated model list, dropping blanks.
pub fn parse_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn numeric_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr + Display,
{
    let raw = get_env(key, Some(&default.to_string()), is_prod)?;
    Ok(parse_or(key, &raw, default))
}

/// Parse `raw`, or warn and fall back to `default`.
fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid numeric setting, using default");
            default
        }
    }
}
