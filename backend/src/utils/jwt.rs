//! JWT token utilities for web session authentication.
//!
//! Session tokens are HS256 JWTs carrying the user id and the session row
//! id. The claims are never trusted for authorization on their own: every
//! request re-reads the session and user rows, so the role claim here is
//! informational (logging, tooling) only.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::errors::{ServiceError, ServiceResult};

/// JWT claims for a web session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Session row ID, re-checked against the database on every request
    pub sid: String,
    /// Role at issuance time (informational)
    pub role: String,
    /// Token expiration timestamp
    pub exp: usize,
    /// Token issued at timestamp
    pub iat: usize,
}

/// JWT token utility for creating and validating session tokens.
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtUtils {
    /// Creates a JwtUtils instance from an explicit secret.
    pub fn from_secret(secret: &str) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtUtils {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Generates a session token bound to a session row.
    pub fn generate_token(
        &self,
        user_id: &str,
        session_id: &str,
        role: &str,
        ttl: Duration,
    ) -> ServiceResult<String> {
        let now = Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            role: role.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::internal_error(format!("Token generation failed: {}", e)))
    }

    /// Validates and decodes a session token.
    pub fn validate_token(&self, token: &str) -> ServiceResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|_| ServiceError::unauthenticated("Invalid session token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let jwt = JwtUtils::from_secret("test-secret");
        let token = jwt
            .generate_token("user-1", "session-1", "user", Duration::hours(1))
            .unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.sid, "session-1");
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn rejects_foreign_secret() {
        let issuer = JwtUtils::from_secret("secret-a");
        let verifier = JwtUtils::from_secret("secret-b");

        let token = issuer
            .generate_token("user-1", "session-1", "user", Duration::hours(1))
            .unwrap();

        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let jwt = JwtUtils::from_secret("test-secret");
        let token = jwt
            .generate_token("user-1", "session-1", "user", Duration::seconds(-120))
            .unwrap();

        assert!(jwt.validate_token(&token).is_err());
    }
}
