use crate::handlers::error::AccountError;
use crate::services::SessionResolver;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;

/// Authenticated user resolved from the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    Arc<dyn SessionResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AccountError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = Arc::<dyn SessionResolver>::from_ref(state);

        resolver
            .resolve(&parts.headers)
            .map(|user_id| SessionUser { user_id })
            .ok_or(AccountError::NotAuthenticated)
    }
}
