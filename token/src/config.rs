//! Token maker configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Duration;
use error::AppError;

use crate::jwt::JwtMaker;
use crate::maker::TokenMaker;
use crate::paseto::PasetoMaker;

/// Token backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// HMAC-signed JWT
    Jwt,
    /// Encrypted PASETO v4.local
    Paseto,
}

impl FromStr for TokenKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jwt" => Ok(Self::Jwt),
            "paseto" => Ok(Self::Paseto),
            other => Err(AppError::Config(format!("unknown token kind {other}"))),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt => f.write_str("jwt"),
            Self::Paseto => f.write_str("paseto"),
        }
    }
}

/// Token configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// Backend used to issue and verify tokens
    pub kind: TokenKind,

    /// Key material: the HMAC secret for JWT, the raw 32-byte key for PASETO
    pub symmetric_key: String,

    /// Access token lifetime in seconds
    pub access_token_duration_secs: i64,
}

const DEFAULT_ACCESS_TOKEN_DURATION_SECS: i64 = 15 * 60;

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            kind: TokenKind::Paseto,
            symmetric_key: String::new(),
            access_token_duration_secs: DEFAULT_ACCESS_TOKEN_DURATION_SECS,
        }
    }
}

/// Parse a token lifetime in seconds. Only positive values that fit a
/// `chrono::Duration` are accepted.
fn parse_duration_secs(value: &str) -> Result<i64, String> {
    let secs: i64 = value
        .trim()
        .parse()
        .map_err(|_| "not an integer".to_string())?;
    if secs <= 0 {
        return Err("must be positive".to_string());
    }
    Duration::try_seconds(secs).ok_or_else(|| "out of range".to_string())?;
    Ok(secs)
}

impl TokenConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(kind) = std::env::var("TOKEN_KIND") {
            match kind.parse() {
                Ok(kind) => config.kind = kind,
                Err(e) => tracing::warn!("Ignoring TOKEN_KIND: {}", e),
            }
        }

        if let Ok(key) = std::env::var("TOKEN_SYMMETRIC_KEY") {
            config.symmetric_key = key;
        }

        if let Ok(duration) = std::env::var("ACCESS_TOKEN_DURATION_SECS") {
            match parse_duration_secs(&duration) {
                Ok(secs) => config.access_token_duration_secs = secs,
                Err(reason) => tracing::warn!(
                    "Ignoring ACCESS_TOKEN_DURATION_SECS={}: {}",
                    duration,
                    reason
                ),
            }
        }

        config
    }

    /// Get access token lifetime as Duration
    ///
    /// A lifetime outside the `chrono::Duration` range falls back to the
    /// default of 15 minutes.
    pub fn access_token_duration(&self) -> Duration {
        Duration::try_seconds(self.access_token_duration_secs)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_ACCESS_TOKEN_DURATION_SECS))
    }

    /// Build the configured token maker.
    pub fn build_maker(&self) -> error::Result<Arc<dyn TokenMaker>> {
        let key = self.symmetric_key.as_bytes();
        let maker: Arc<dyn TokenMaker> = match self.kind {
            TokenKind::Jwt => Arc::new(JwtMaker::new(key)?),
            TokenKind::Paseto => Arc::new(PasetoMaker::from_bytes(key)?),
        };

        tracing::info!(
            "Token maker configured: {} (access token lifetime {}s)",
            self.kind,
            self.access_token_duration_secs
        );
        Ok(maker)
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("kind", &self.kind)
            .field("symmetric_key", &"<redacted>")
            .field("access_token_duration_secs", &self.access_token_duration_secs)
            .finish()
    }
}
