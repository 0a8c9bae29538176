//! Bearer token authentication for request handlers.
//!
//! Framework-independent: callers pass the raw `Authorization` header value
//! and map the resulting [`AuthError`] to an unauthorized response via
//! [`error::ErrorResponse`].

use error::AuthError;

use crate::maker::TokenMaker;
use crate::payload::Payload;

/// Header that carries the credential.
pub const AUTHORIZATION_HEADER_KEY: &str = "authorization";

/// Only supported authorization scheme.
pub const AUTHORIZATION_TYPE_BEARER: &str = "bearer";

/// Authenticate a request from its `Authorization` header.
///
/// On success the returned payload identifies the principal. Verification
/// failures are wrapped in [`AuthError::InvalidToken`] and logged at debug
/// level by kind only.
pub fn authenticate(maker: &dyn TokenMaker, header: Option<&str>) -> Result<Payload, AuthError> {
    let header = header
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingAuthorization)?;

    let mut fields = header.split_whitespace();
    let (scheme, token) = match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(token), None) => (scheme, token),
        _ => return Err(AuthError::InvalidAuthorizationFormat),
    };

    if !scheme.eq_ignore_ascii_case(AUTHORIZATION_TYPE_BEARER) {
        return Err(AuthError::UnsupportedAuthorizationType(
            scheme.to_lowercase(),
        ));
    }

    maker.verify_token(token).map_err(|e| {
        tracing::debug!(kind = e.kind(), "Rejected bearer token");
        AuthError::InvalidToken(e)
    })
}

/// Format a token as an `Authorization` header value.
pub fn bearer_header(token: &str) -> String {
    format!("Bearer {token}")
}
