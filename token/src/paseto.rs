//! PASETO token maker.
//!
//! Tokens are `v4.local` PASETOs: the claims are encrypted and authenticated
//! with a 256-bit symmetric key, so holders cannot read them.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use error::TokenError;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::errors::{ClaimValidationError, Error as PasetorsError};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::V4;
use pasetors::{local, Local};
use uuid::Uuid;

use crate::maker::TokenMaker;
use crate::payload::{check_time_window, Payload, ISSUER};

/// Symmetric key size in bytes.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Issues and verifies encrypted `v4.local` PASETOs.
pub struct PasetoMaker {
    key: SymmetricKey<V4>,
}

impl PasetoMaker {
    pub fn new(key: SymmetricKey<V4>) -> Self {
        Self { key }
    }

    /// Create a maker from raw key bytes, which must be exactly
    /// [`SYMMETRIC_KEY_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let key = SymmetricKey::<V4>::from(bytes).map_err(|_| TokenError::InvalidKeySize {
            min: SYMMETRIC_KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self::new(key))
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<Payload, TokenError> {
        let untrusted =
            UntrustedToken::<Local, V4>::try_from(token).map_err(|_| TokenError::InvalidToken)?;

        // Presence and the time window of iat/nbf/exp are checked below.
        let mut rules = ClaimsValidationRules::new();
        rules.disable_valid_at();
        rules.allow_non_expiring();
        let trusted =
            local::decrypt(&self.key, &untrusted, &rules, None, None).map_err(decrypt_error)?;

        let claims = trusted
            .payload_claims()
            .ok_or_else(|| TokenError::InvalidClaims("payload is not a claim set".to_string()))?;

        let expired_at = time_claim(claims, "exp")?;
        let not_before = time_claim(claims, "nbf")?;
        check_time_window(expired_at.timestamp(), not_before.timestamp(), now)?;
        from_claims(claims)
    }
}

impl TokenMaker for PasetoMaker {
    fn create_token(&self, username: &str, duration: Duration) -> Result<String, TokenError> {
        let payload = Payload::new(username, duration)?;
        let claims = to_claims(&payload).map_err(creation_error)?;

        local::encrypt(&self.key, &claims, None, None).map_err(creation_error)
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }
}

impl fmt::Debug for PasetoMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasetoMaker").finish_non_exhaustive()
    }
}

fn to_claims(payload: &Payload) -> Result<Claims, PasetorsError> {
    let issued_at = rfc3339(&payload.issued_at);

    let mut claims = Claims::new()?;
    claims.token_identifier(&payload.id.to_string())?;
    claims.subject(&payload.username)?;
    claims.issued_at(&issued_at)?;
    claims.expiration(&rfc3339(&payload.expired_at))?;
    claims.not_before(&issued_at)?;
    claims.issuer(&payload.issuer)?;
    Ok(claims)
}

fn from_claims(claims: &Claims) -> Result<Payload, TokenError> {
    let id = Uuid::parse_str(string_claim(claims, "jti")?)
        .map_err(|_| TokenError::InvalidClaims("jti is not a uuid".to_string()))?;

    let issuer = string_claim(claims, "iss")?;
    if issuer != ISSUER {
        return Err(TokenError::InvalidClaims(format!(
            "unexpected issuer {issuer}"
        )));
    }

    Ok(Payload {
        id,
        username: string_claim(claims, "sub")?.to_string(),
        issued_at: time_claim(claims, "iat")?,
        expired_at: time_claim(claims, "exp")?,
        issuer: issuer.to_string(),
    })
}

fn string_claim<'a>(claims: &'a Claims, name: &str) -> Result<&'a str, TokenError> {
    claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| TokenError::InvalidClaims(format!("{name} is missing")))
}

fn time_claim(claims: &Claims, name: &str) -> Result<DateTime<Utc>, TokenError> {
    let value = string_claim(claims, name)?;
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| TokenError::InvalidClaims(format!("{name} is not an RFC 3339 time")))
}

fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn creation_error(err: PasetorsError) -> TokenError {
    TokenError::TokenCreation(err.to_string())
}

// Authentication failures stay indistinguishable. The claim errors below
// are only raised once the tag has been verified.
fn decrypt_error(err: PasetorsError) -> TokenError {
    match err {
        PasetorsError::ClaimValidation(ClaimValidationError::Exp) => TokenError::Expired,
        PasetorsError::ClaimValidation(_)
        | PasetorsError::InvalidClaim
        | PasetorsError::ClaimInvalidJson
        | PasetorsError::ClaimInvalidUtf8
        | PasetorsError::PayloadInvalidUtf8 => TokenError::InvalidClaims(err.to_string()),
        _ => TokenError::InvalidToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::random_owner;
    use pasetors::keys::Generate;

    fn maker() -> PasetoMaker {
        PasetoMaker::new(SymmetricKey::<V4>::generate().unwrap())
    }

    #[test]
    fn test_create_and_verify_token() {
        let maker = maker();
        let username = random_owner();
        let duration = Duration::minutes(1);
        let issued_at = Utc::now();
        let expired_at = issued_at + duration;

        let token = maker.create_token(&username, duration).unwrap();
        assert!(token.starts_with("v4.local."));

        let payload = maker.verify_token(&token).unwrap();
        assert!(!payload.id.is_nil());
        assert_eq!(payload.username, username);
        assert_eq!(payload.issuer, ISSUER);
        assert!((payload.issued_at - issued_at).num_seconds().abs() <= 1);
        assert!((payload.expired_at - expired_at).num_seconds().abs() <= 1);
    }

    #[test]
    fn test_claims_are_not_readable() {
        let maker = maker();
        let username = "plaintext-owner";
        let token = maker.create_token(username, Duration::minutes(1)).unwrap();
        assert!(!token.contains(username));
    }

    #[test]
    fn test_expired_token() {
        let maker = maker();
        let token = maker
            .create_token(&random_owner(), -Duration::minutes(1))
            .unwrap();
        assert!(!token.is_empty());

        assert_eq!(maker.verify_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_key_and_corruption_fail_alike() {
        let maker = maker();
        let token = maker.create_token("alice", Duration::minutes(1)).unwrap();

        let wrong_key = self::maker().verify_token(&token);
        assert_eq!(wrong_key, Err(TokenError::InvalidToken));

        let body_start = "v4.local.".len();
        let mut bytes = token.into_bytes();
        bytes[body_start + 40] = if bytes[body_start + 40] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(bytes).unwrap();
        assert_eq!(maker.verify_token(&corrupted), wrong_key);
    }

    #[test]
    fn test_expired_token_with_wrong_key_is_invalid() {
        let token = maker()
            .create_token("alice", -Duration::minutes(1))
            .unwrap();
        assert_eq!(maker().verify_token(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_malformed_token() {
        let maker = maker();
        for token in ["", "v4.local.", "v4.public.abc", "eyJhbGciOiJIUzI1NiJ9.e30.sig"] {
            assert_eq!(maker.verify_token(token), Err(TokenError::InvalidToken));
        }
    }

    #[test]
    fn test_from_bytes() {
        let maker = PasetoMaker::from_bytes(&[7u8; SYMMETRIC_KEY_SIZE]).unwrap();
        let token = maker.create_token("alice", Duration::minutes(1)).unwrap();

        let same_key = PasetoMaker::from_bytes(&[7u8; SYMMETRIC_KEY_SIZE]).unwrap();
        assert_eq!(same_key.verify_token(&token).unwrap().username, "alice");

        assert!(matches!(
            PasetoMaker::from_bytes(&[7u8; 16]),
            Err(TokenError::InvalidKeySize { min: 32, actual: 16 })
        ));
    }

    #[test]
    fn test_empty_username_is_refused() {
        let result = maker().create_token("", Duration::minutes(1));
        assert!(matches!(result, Err(TokenError::TokenCreation(_))));
    }

    #[test]
    fn test_claims_mapping() {
        let payload = Payload::new("alice", Duration::minutes(5)).unwrap();
        let claims = to_claims(&payload).unwrap();

        assert_eq!(claims.get_claim("nbf"), claims.get_claim("iat"));
        assert_eq!(from_claims(&claims).unwrap(), payload);
    }

    #[test]
    fn test_missing_claim() {
        let mut claims = Claims::new().unwrap();
        claims.subject("alice").unwrap();
        claims.issuer(ISSUER).unwrap();

        assert!(matches!(
            from_claims(&claims),
            Err(TokenError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_foreign_issuer() {
        let payload = Payload {
            issuer: "elsewhere".to_string(),
            ..Payload::new("alice", Duration::minutes(5)).unwrap()
        };
        let claims = to_claims(&payload).unwrap();

        assert!(matches!(
            from_claims(&claims),
            Err(TokenError::InvalidClaims(_))
        ));
    }

    fn seal(maker: &PasetoMaker, claims: &Claims) -> String {
        local::encrypt(&maker.key, claims, None, None).unwrap()
    }

    #[test]
    fn test_missing_time_claims_are_invalid_claims() {
        let maker = maker();
        for name in ["exp", "nbf", "iat"] {
            let payload = Payload::new("alice", Duration::minutes(5)).unwrap();
            let mut claims = to_claims(&payload).unwrap();
            claims.remove_claim(name).unwrap();

            assert!(
                matches!(
                    maker.verify_token(&seal(&maker, &claims)),
                    Err(TokenError::InvalidClaims(_))
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn test_not_yet_valid() {
        let maker = maker();
        let payload = Payload::new("alice", Duration::minutes(5)).unwrap();
        let mut claims = to_claims(&payload).unwrap();
        claims
            .not_before(&rfc3339(&(Utc::now() + Duration::minutes(1))))
            .unwrap();

        assert_eq!(
            maker.verify_token(&seal(&maker, &claims)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let maker = maker();
        let token = maker.create_token("alice", Duration::minutes(1)).unwrap();
        let exp = maker.verify_token(&token).unwrap().expired_at.timestamp();

        assert!(maker.verify_at(&token, exp - 1).is_ok());
        assert_eq!(maker.verify_at(&token, exp), Err(TokenError::Expired));
    }
}
