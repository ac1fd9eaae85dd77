//! HS256 bearer tokens carrying the caller's id, display name and role claim

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{PairError, Result};
use crate::models::Role;

/// Minimum accepted secret length
pub const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Who a new token is issued for
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub sub: String,
    pub name: String,
    pub role: Role,
}

/// Signs and checks bearer tokens with one shared secret
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Rejects empty or short secrets
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(PairError::Config(format!(
                "JWT secret must be at least {} characters (or run with --dev)",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self { secret, expiry_seconds })
    }

    /// Fixed, public secret for local development
    pub fn new_dev() -> Self {
        Self {
            secret: DEV_SECRET.into(),
            expiry_seconds: 3600,
        }
    }

    pub fn generate_token(&self, input: TokenInput) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PairError::Internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: input.sub,
            name: input.name,
            role: input.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| PairError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Decode a token; any failure is `Unauthenticated` with a short reason
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            let reason = match e.kind() {
                JwtErrorKind::ExpiredSignature => "token expired",
                JwtErrorKind::InvalidSignature => "bad signature",
                _ => "malformed token",
            };
            PairError::Unauthenticated(reason.into())
        })
    }
}

/// Token part of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret-that-is-at-least-32-characters-long".into(), 3600).unwrap()
    }

    fn casey() -> TokenInput {
        TokenInput {
            sub: "client-123".into(),
            name: "Casey".into(),
            role: Role::Client,
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let v = validator();
        let claims = v.verify_token(&v.generate_token(casey()).unwrap()).unwrap();
        assert_eq!(claims.sub, "client-123");
        assert_eq!(claims.role, Role::Client);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_rejected_tokens_are_unauthenticated() {
        let token = validator().generate_token(casey()).unwrap();
        let other =
            JwtValidator::new("different-secret-that-is-at-least-32-characters".into(), 3600).unwrap();

        let err = other.verify_token(&token).unwrap_err();
        assert!(matches!(err, PairError::Unauthenticated(ref r) if r == "bad signature"));

        let err = validator().verify_token("not-a-jwt").unwrap_err();
        assert!(matches!(err, PairError::Unauthenticated(ref r) if r == "malformed token"));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(Some("bearer  abc123 ")), Some("abc123"));
        assert_eq!(bearer_token(Some("abc123")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Basic abc123")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_secret_validation() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new("".into(), 3600).is_err());
        assert!(JwtValidator::new("this-secret-is-at-least-32-chars-long".into(), 3600).is_ok());
    }
}
