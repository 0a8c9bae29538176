//! JWT token maker.
//!
//! Tokens are HS256-signed JWTs. Verification accepts only the HMAC family
//! and checks the expiration claim before any signature work is done.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use error::TokenError;
use hmac::{Hmac, Mac};
use jwt::{AlgorithmType, Header, SignWithKey, Token, Verified, VerifyWithKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Sha256, Sha384, Sha512};
use uuid::Uuid;

use crate::maker::TokenMaker;
use crate::payload::{check_time_window, is_expired_at, Payload, ISSUER};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Minimum secret length in bytes.
pub const MIN_SECRET_KEY_SIZE: usize = 32;

const ACCEPTED_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

// Reads `alg` as a plain string, so names the jwt crate does not know
// are still recognised as algorithms.
fn declared_algorithm(token: &str) -> Result<String, TokenError> {
    let header = token.split_once('.').map_or(token, |(header, _)| header);
    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;
    Ok(header.alg)
}

/// Registered claims written into every JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JwtClaims {
    jti: String,
    sub: String,
    iss: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

impl From<&Payload> for JwtClaims {
    fn from(payload: &Payload) -> Self {
        Self {
            jti: payload.id.to_string(),
            sub: payload.username.clone(),
            iss: payload.issuer.clone(),
            iat: payload.issued_at.timestamp(),
            nbf: payload.issued_at.timestamp(),
            exp: payload.expired_at.timestamp(),
        }
    }
}

impl TryFrom<JwtClaims> for Payload {
    type Error = TokenError;

    fn try_from(claims: JwtClaims) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&claims.jti)
            .map_err(|_| TokenError::InvalidClaims("jti is not a uuid".to_string()))?;

        if claims.iss != ISSUER {
            return Err(TokenError::InvalidClaims(format!(
                "unexpected issuer {}",
                claims.iss
            )));
        }

        Ok(Self {
            id,
            username: claims.sub,
            issued_at: numeric_date(claims.iat, "iat")?,
            expired_at: numeric_date(claims.exp, "exp")?,
            issuer: claims.iss,
        })
    }
}

fn numeric_date(seconds: i64, claim: &str) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| TokenError::InvalidClaims(format!("{claim} is out of range")))
}

/// Issues and verifies HMAC-signed JWTs.
#[derive(Clone)]
pub struct JwtMaker {
    hs256: HmacSha256,
    hs384: HmacSha384,
    hs512: HmacSha512,
}

impl JwtMaker {
    /// Create a maker from a secret of at least [`MIN_SECRET_KEY_SIZE`] bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        let invalid_size = || TokenError::InvalidKeySize {
            min: MIN_SECRET_KEY_SIZE,
            actual: secret.len(),
        };
        if secret.len() < MIN_SECRET_KEY_SIZE {
            return Err(invalid_size());
        }

        Ok(Self {
            hs256: HmacSha256::new_from_slice(secret).map_err(|_| invalid_size())?,
            hs384: HmacSha384::new_from_slice(secret).map_err(|_| invalid_size())?,
            hs512: HmacSha512::new_from_slice(secret).map_err(|_| invalid_size())?,
        })
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<Payload, TokenError> {
        // Anything outside the HMAC family is refused before a key is chosen.
        let declared = declared_algorithm(token)?;
        if !ACCEPTED_ALGORITHMS.contains(&declared.as_str()) {
            return Err(TokenError::InvalidSignature);
        }

        let unverified: Token<Header, BTreeMap<String, Value>, _> =
            Token::parse_unverified(token).map_err(|_| TokenError::Malformed)?;

        let exp = unverified
            .claims()
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| TokenError::InvalidClaims("exp is missing".to_string()))?;
        if is_expired_at(exp, now) {
            return Err(TokenError::Expired);
        }

        let algorithm = unverified.header().algorithm;
        let verified: Token<Header, BTreeMap<String, Value>, Verified> = match algorithm {
            AlgorithmType::Hs384 => unverified.verify_with_key(&self.hs384),
            AlgorithmType::Hs512 => unverified.verify_with_key(&self.hs512),
            _ => unverified.verify_with_key(&self.hs256),
        }
        .map_err(|_| TokenError::InvalidSignature)?;

        let claims: JwtClaims = serde_json::from_value(Value::Object(
            verified.claims().clone().into_iter().collect(),
        ))
        .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;

        check_time_window(claims.exp, claims.nbf, now)?;
        Payload::try_from(claims)
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(&self, username: &str, duration: Duration) -> Result<String, TokenError> {
        let payload = Payload::new(username, duration)?;

        let header = Header {
            algorithm: AlgorithmType::Hs256,
            ..Default::default()
        };
        let token = Token::new(header, JwtClaims::from(&payload))
            .sign_with_key(&self.hs256)
            .map_err(|e| TokenError::TokenCreation(e.to_string()))?;

        Ok(token.as_str().to_string())
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }
}

impl fmt::Debug for JwtMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtMaker").finish_non_exhaustive()
    }
}
