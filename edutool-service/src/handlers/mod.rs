//! HTTP handlers for edutool-service.

pub mod account;
pub mod error;
pub mod generation;
pub mod health;

pub use account::delete_account;
pub use error::AccountError;
pub use generation::{analyze_image, enhance_prompt, generate_tool};
pub use health::{health_check, metrics_handler, readiness_check};
