//! Global application error types and handlers.
//!
//! This module defines custom error types that are used across the entire
//! backend application and provides mechanisms for consistent error handling
//! and response formatting.

use thiserror::Error;

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad email/password combination. Carries no detail about which of the
    /// two checks failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has already been used")]
    TokenAlreadyUsed,

    /// The token is genuine but belongs to a different player identity.
    #[error("Token does not match the claimed identity")]
    IdentityMismatch,

    #[error("Account is banned")]
    Banned { reason: Option<String> },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} has already been reviewed")]
    AlreadyReviewed { entity: String },

    /// A pending or approved application already exists for the identifier.
    #[error("An active application already exists for {identifier}")]
    DuplicateActive { identifier: String },

    #[error("A pending request already exists")]
    DuplicatePending,

    #[error("Invalid trust level transition: {message}")]
    InvalidTransition { message: String },

    /// Carries the unmet requirements so the caller can render progress.
    #[error("Requirements not met: {}", missing.join(", "))]
    NotEligible { missing: Vec<String> },

    #[error("Users cannot vote on themselves")]
    SelfVote,

    #[error("Already voted on this user within the last 24 hours")]
    VoteCooldown,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn banned(reason: Option<String>) -> Self {
        Self::Banned { reason }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn already_reviewed(entity: impl Into<String>) -> Self {
        Self::AlreadyReviewed {
            entity: entity.into(),
        }
    }

    pub fn duplicate_active(identifier: impl Into<String>) -> Self {
        Self::DuplicateActive {
            identifier: identifier.into(),
        }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: message.into(),
        }
    }

    pub fn not_eligible(missing: Vec<String>) -> Self {
        Self::NotEligible { missing }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
