//! Data structures for authentication-related entities.
//!
//! This module defines the request/response payloads for the login and token
//! flows, plus the `Principal` every authenticated request resolves to.

use crate::database::models::{User, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The resolved identity of an authenticated caller. Always built from a
/// fresh User row, never from cached claims, so bans and role changes take
/// effect on the next request.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub nickname: String,
    pub role: UserRole,
    pub trust_level: i64,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Principal {
            user_id: user.id.clone(),
            nickname: user.nickname.clone(),
            role: user.role,
            trust_level: user.trust_level,
        }
    }
}

/// Permissions granted to the bearer of a plugin API token.
#[derive(Debug, Clone)]
pub struct TokenScope {
    permissions: Vec<String>,
}

impl TokenScope {
    pub fn new(permissions: Vec<String>) -> Self {
        Self { permissions }
    }

    /// Scope for web-session bearers falling back through the API-token
    /// path: they act as the user itself, not a narrowed service account.
    pub fn wildcard() -> Self {
        Self {
            permissions: vec!["*".to_string()],
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == "*" || p == permission)
    }
}

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Extends the session from 24 hours to 30 days.
    #[serde(default)]
    pub remember: bool,
}

/// Login response containing the session token and user info
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

/// User information returned to authenticated callers
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub nickname: String,
    pub email: String,
    pub role: UserRole,
    pub trust_level: i64,
    pub is_email_verified: bool,
}

impl UserInfo {
    pub fn from_user(user: &User) -> Self {
        UserInfo {
            id: user.id.clone(),
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            role: user.role,
            trust_level: user.trust_level,
            is_email_verified: user.is_email_verified,
        }
    }
}

/// One-time game login token, returned exactly once in plaintext.
#[derive(Debug, Serialize)]
pub struct IssuedGameToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_scope_wildcard_and_exact() {
        let scope = TokenScope::new(vec!["game:verify".to_string()]);
        assert!(scope.has_permission("game:verify"));
        assert!(!scope.has_permission("stats:write"));

        let all = TokenScope::wildcard();
        assert!(all.has_permission("game:verify"));
        assert!(all.has_permission("stats:write"));
    }
}
