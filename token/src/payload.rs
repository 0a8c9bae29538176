//! Token payload shared by both token makers.

use chrono::{DateTime, Duration, Utc};
use error::TokenError;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

/// Issuer written into every token.
pub const ISSUER: &str = "simplebank";

/// Claims carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Unique token id
    pub id: Uuid,
    /// Authenticated principal
    pub username: String,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Expiration time
    pub expired_at: DateTime<Utc>,
    /// Issuing service
    pub issuer: String,
}

impl Payload {
    /// Create a fresh payload for `username`, valid for `duration`.
    ///
    /// A negative duration yields a payload that is already expired.
    pub fn new(username: impl Into<String>, duration: Duration) -> Result<Self, TokenError> {
        let id = random_token_id()?;
        let issued_at = Utc::now();
        let expired_at = issued_at
            .checked_add_signed(duration)
            .ok_or(TokenError::DurationOverflow)?;

        Ok(Self {
            id,
            username: username.into(),
            issued_at,
            expired_at,
            issuer: ISSUER.to_string(),
        })
    }

    /// Check if the payload has expired.
    pub fn is_expired(&self) -> bool {
        is_expired_at(self.expired_at.timestamp(), Utc::now().timestamp())
    }
}

/// Expiry rule applied to `exp` claims (unix seconds).
pub(crate) fn is_expired_at(exp: i64, now: i64) -> bool {
    exp <= now
}

/// Time-window check shared by both makers. A token that is not yet valid
/// is reported as expired.
pub(crate) fn check_time_window(exp: i64, nbf: i64, now: i64) -> Result<(), TokenError> {
    if is_expired_at(exp, now) || nbf > now {
        return Err(TokenError::Expired);
    }
    Ok(())
}

// Each call reads the OS CSPRNG, so concurrent issuers share no generator state.
fn random_token_id() -> Result<Uuid, TokenError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::IdGeneration(e.to_string()))?;
    Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
}
