//! Access tokens for the banking service.
//!
//! Two interchangeable backends implement [`TokenMaker`]: [`JwtMaker`]
//! issues HMAC-signed JWTs whose claims anyone can read, [`PasetoMaker`]
//! issues encrypted PASETO v4.local tokens. [`TokenConfig`] picks one at
//! startup and [`bearer::authenticate`] checks incoming requests.

pub mod bearer;
mod config;
mod jwt;
mod maker;
mod paseto;
mod payload;

#[cfg(test)]
mod testing;

pub use config::{TokenConfig, TokenKind};
pub use error::{AuthError, ErrorResponse, TokenError};
pub use crate::jwt::{JwtMaker, MIN_SECRET_KEY_SIZE};
pub use maker::TokenMaker;
pub use paseto::{PasetoMaker, SYMMETRIC_KEY_SIZE};
pub use payload::{Payload, ISSUER};

// Re-export key types so callers can provision PASETO keys
pub use pasetors::keys::{Generate, SymmetricKey};
pub use pasetors::version4::V4;
