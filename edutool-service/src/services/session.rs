//! Session cookie resolution.
//!
//! The session cookie carries `<user_id>.<hex HMAC-SHA256(user_id)>`. Anything
//! that fails verification is treated as no session at all.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use service_core::utils::signature::{sign_value, unsign_value};

/// Maps request headers to an authenticated user id.
pub trait SessionResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;

    /// Name of the cookie holding the session.
    fn cookie_name(&self) -> &str;

    /// `Set-Cookie` value that makes the browser drop the session.
    fn clearing_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0",
            self.cookie_name()
        )
    }
}

/// Resolves sessions from an HMAC-signed cookie.
pub struct SignedCookieSessionResolver {
    secret: String,
    cookie_name: String,
}

impl SignedCookieSessionResolver {
    pub fn new(secret: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: cookie_name.into(),
        }
    }

    /// Build the cookie value for `user_id`.
    pub fn issue(&self, user_id: &str) -> Result<String, anyhow::Error> {
        sign_value(&self.secret, user_id)
    }
}

impl SessionResolver for SignedCookieSessionResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        let jar = CookieJar::from_headers(headers);
        let token = jar.get(&self.cookie_name)?.value().to_string();
        let user_id = unsign_value(&self.secret, &token);
        if user_id.is_none() {
            tracing::debug!(cookie = %self.cookie_name, "Session cookie failed verification");
        }
        user_id
    }

    fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}
