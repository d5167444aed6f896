//! Signed identity tokens.
//!
//! Tokens are HS256 JWTs whose claims carry the principal's email and an
//! expiry. The secret is always passed in by the caller; nothing here reads
//! configuration on its own.

pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use password::{hash_password, verify_password, PasswordError};

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(email: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            email: email.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("token signature or signing method is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

/// Sign `claims` with `secret`
pub fn issue(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(ALGORITHM), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature, algorithm and expiry, returning the decoded claims
pub fn validate(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Malformed(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn claims_expiring_in(seconds: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            email: "alice@example.com".to_string(),
            exp: now + seconds,
            iat: now,
        }
    }

    #[test]
    fn round_trip_returns_the_same_claims() {
        let claims = Claims::new("alice@example.com", 5);
        let token = issue(&claims, SECRET).unwrap();

        assert_eq!(validate(&token, SECRET), Ok(claims));
    }

    #[test]
    fn wrong_secret_is_an_invalid_signature() {
        let token = issue(&claims_expiring_in(600), SECRET).unwrap();

        assert_eq!(validate(&token, "other-secret"), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn swapped_signature_is_rejected() {
        let token = issue(&claims_expiring_in(600), SECRET).unwrap();
        let forged = issue(&claims_expiring_in(600), "attacker-secret").unwrap();

        let (body, _) = token.rsplit_once('.').unwrap();
        let (_, forged_signature) = forged.rsplit_once('.').unwrap();
        let tampered = format!("{}.{}", body, forged_signature);

        assert_eq!(validate(&tampered, SECRET), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn past_expiry_is_rejected() {
        let token = issue(&claims_expiring_in(-10), SECRET).unwrap();

        assert_eq!(validate(&token, SECRET), Err(AuthError::Expired));
    }

    #[test]
    fn other_signing_algorithm_is_rejected() {
        let claims = claims_expiring_in(600);
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(validate(&token, SECRET), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(validate("not-a-token", SECRET), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let claims = claims_expiring_in(600);
        assert_eq!(issue(&claims, ""), Err(AuthError::MissingSecret));
        assert_eq!(validate("a.b.c", ""), Err(AuthError::MissingSecret));
    }
}
