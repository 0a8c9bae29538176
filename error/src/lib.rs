//! Common error types for the token subsystem.
//!
//! Token makers return [`TokenError`]; request authentication wraps it in
//! [`AuthError`]. Both convert into an [`ErrorResponse`] that never exposes
//! which cryptographic check failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors raised while wiring up the token subsystem.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors produced while issuing or verifying a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid key size: need {min} bytes, got {actual}")]
    InvalidKeySize { min: usize, actual: usize },

    #[error("failed to generate token id: {0}")]
    IdGeneration(String),

    #[error("token duration overflows the supported time range")]
    DurationOverflow,

    #[error("failed to create token: {0}")]
    TokenCreation(String),

    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    /// Decryption or authentication of an encrypted token failed.
    #[error("token is invalid")]
    InvalidToken,

    #[error("token is malformed")]
    Malformed,

    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),
}

impl TokenError {
    /// Stable identifier for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::InvalidKeySize { .. } => "invalid_key_size",
            TokenError::IdGeneration(_) => "id_generation",
            TokenError::DurationOverflow => "duration_overflow",
            TokenError::TokenCreation(_) => "token_creation",
            TokenError::Expired => "expired",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::InvalidToken => "invalid_token",
            TokenError::Malformed => "malformed",
            TokenError::InvalidClaims(_) => "invalid_claims",
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Expired)
    }

    /// Whether the error came from verifying a presented token rather than
    /// from building a maker or issuing a token.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            TokenError::Expired
                | TokenError::InvalidSignature
                | TokenError::InvalidToken
                | TokenError::Malformed
                | TokenError::InvalidClaims(_)
        )
    }
}

/// Bearer authentication errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header is not provided")]
    MissingAuthorization,

    #[error("invalid authorization header format")]
    InvalidAuthorizationFormat,

    #[error("unsupported authorization type {0}")]
    UnsupportedAuthorizationType(String),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
}

/// Error response for API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&TokenError> for ErrorResponse {
    fn from(err: &TokenError) -> Self {
        if err.is_verification_failure() {
            return Self::new("AUTH_INVALID_TOKEN", "invalid token");
        }
        Self::new("AUTH_TOKEN_CREATION_FAILED", "failed to create token")
    }
}

impl From<TokenError> for ErrorResponse {
    fn from(err: TokenError) -> Self {
        Self::from(&err)
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::MissingAuthorization
            | AuthError::InvalidAuthorizationFormat
            | AuthError::UnsupportedAuthorizationType(_) => {
                Self::new("AUTH_UNAUTHORIZED", err.to_string())
            }
            AuthError::InvalidToken(_) => Self::new("AUTH_INVALID_TOKEN", "invalid token"),
        }
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_failures_share_one_response() {
        let errors = [
            TokenError::Expired,
            TokenError::InvalidSignature,
            TokenError::InvalidToken,
            TokenError::Malformed,
            TokenError::InvalidClaims("sub".to_string()),
        ];

        for err in errors {
            let response = ErrorResponse::from(AuthError::from(err.clone()));
            assert_eq!(response.code, "AUTH_INVALID_TOKEN");
            assert_eq!(response.message, "invalid token");
            assert!(response.details.is_none());
            assert_eq!(ErrorResponse::from(&err), response);
        }
    }

    #[test]
    fn test_issuance_failures_are_not_verification_failures() {
        let err = TokenError::InvalidKeySize { min: 32, actual: 8 };
        assert!(!err.is_verification_failure());
        assert_eq!(err.kind(), "invalid_key_size");
        assert_eq!(
            err.to_string(),
            "invalid key size: need 32 bytes, got 8"
        );

        let response = ErrorResponse::from(TokenError::IdGeneration("rng".to_string()));
        assert_eq!(response.code, "AUTH_TOKEN_CREATION_FAILED");
    }

    #[test]
    fn test_header_errors_keep_their_message() {
        let response = ErrorResponse::from(AuthError::UnsupportedAuthorizationType(
            "basic".to_string(),
        ));
        assert_eq!(response.code, "AUTH_UNAUTHORIZED");
        assert_eq!(response.message, "unsupported authorization type basic");
    }

    #[test]
    fn test_error_response_serialization_skips_empty_details() {
        let json = serde_json::to_string(&ErrorResponse::new("X", "y")).unwrap();
        assert_eq!(json, r#"{"code":"X","message":"y"}"#);

        let with = ErrorResponse::new("X", "y").with_details("z");
        assert_eq!(with.details.as_deref(), Some("z"));
    }
}
