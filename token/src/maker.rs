//! The operations every token backend provides.

use chrono::Duration;
use error::TokenError;

use crate::payload::Payload;

/// Issues and verifies access tokens.
///
/// Implementations hold only immutable key material, so one instance can be
/// shared across threads without locking. Callers should treat every
/// verification error the same way towards clients; the error kinds differ
/// between backends and are meant for internal use.
pub trait TokenMaker: Send + Sync {
    /// Create a token for `username` that is valid for `duration`.
    fn create_token(&self, username: &str, duration: Duration) -> Result<String, TokenError>;

    /// Check the token and return the payload it carries.
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError>;
}
