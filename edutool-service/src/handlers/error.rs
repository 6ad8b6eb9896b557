//! HTTP error mapping for edutool handlers.

use crate::services::{GenerationError, ToolError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use thiserror::Error;

/// Failures of session-guarded account operations.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Database not configured")]
    StorageUnavailable,

    #[error("Failed to delete account")]
    DeletionFailed(#[source] AppError),
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AccountError::StorageUnavailable | AccountError::DeletionFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        if let AccountError::DeletionFailed(err) = &self {
            tracing::error!(error = %err, "Account deletion failed");
        }

        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        if matches!(err.generation_error(), GenerationError::InvalidRequest(_)) {
            AppError::BadRequest(anyhow::Error::new(err))
        } else {
            AppError::BadGateway(err.to_string())
        }
    }
}
