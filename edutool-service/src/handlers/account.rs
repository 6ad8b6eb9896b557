use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::handlers::error::AccountError;
use crate::models::SessionUser;
use crate::services::metrics;
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Delete the signed-in user and everything they own, then end the session.
#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn delete_account(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Response, AccountError> {
    let store = state.accounts.as_ref().ok_or_else(|| {
        tracing::error!("Account deletion requested but no database is configured");
        metrics::record_account_deletion("storage_unavailable");
        AccountError::StorageUnavailable
    })?;

    let summary = store.delete_account(&user.user_id).await.map_err(|e| {
        metrics::record_account_deletion("failed");
        AccountError::DeletionFailed(e)
    })?;

    metrics::record_account_deletion("success");
    tracing::info!(rows_deleted = summary.total(), "Account deleted");

    let mut response = (
        StatusCode::OK,
        Json(DeleteAccountResponse {
            success: true,
            message: "Account deleted successfully".to_string(),
        }),
    )
        .into_response();

    match HeaderValue::from_str(&state.sessions.clearing_cookie()) {
        Ok(cookie) => {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        Err(e) => tracing::warn!(error = %e, "Could not build session clearing cookie"),
    }

    Ok(response)
}
