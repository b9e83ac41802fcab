//! User business logic service.
//!
//! Handles account-level operations: moderation (ban/unban), the admin
//! trust-level escape hatch and password changes.

use crate::api::common::validate_request;
use crate::database::models::{BanUserRequest, ChangePasswordRequest, SetTrustLevelRequest, User};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::session_repository::SessionRepository;
use crate::repositories::user_repository::UserRepository;
use bcrypt::{DEFAULT_COST, hash, verify};
use sqlx::SqlitePool;

pub struct UserService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserService<'a> {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Retrieves a user by ID with existence verification.
    pub async fn get_user_required(&self, id: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let user = repo
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;
        Ok(user)
    }

    /// Bans a user and drops their sessions, so the ban takes effect on the
    /// very next request.
    pub async fn ban_user(&self, target_id: &str, request: &BanUserRequest) -> ServiceResult<User> {
        validate_request(request)?;

        let repo = UserRepository::new(self.pool);
        let rows = repo
            .set_banned(target_id, &request.reason, request.expires_at)
            .await?;
        if rows == 0 {
            return Err(ServiceError::not_found("User", target_id));
        }

        SessionRepository::new(self.pool)
            .deactivate_all_for_user(target_id)
            .await?;

        tracing::warn!(user_id = %target_id, reason = %request.reason, "user banned");

        self.get_user_required(target_id).await
    }

    pub async fn unban_user(&self, target_id: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        if repo.clear_ban(target_id).await? == 0 {
            return Err(ServiceError::not_found("User", target_id));
        }

        tracing::info!(user_id = %target_id, "user unbanned");

        self.get_user_required(target_id).await
    }

    /// Admin escape hatch: writes a trust level directly, bypassing the
    /// reviewed upgrade path.
    pub async fn set_trust_level(
        &self,
        target_id: &str,
        request: &SetTrustLevelRequest,
    ) -> ServiceResult<User> {
        validate_request(request)?;

        let repo = UserRepository::new(self.pool);
        let mut conn = self.pool.acquire().await.map_err(anyhow::Error::from)?;
        if repo
            .set_trust_level(&mut conn, target_id, request.trust_level)
            .await?
            == 0
        {
            return Err(ServiceError::not_found("User", target_id));
        }
        drop(conn);

        tracing::warn!(
            user_id = %target_id,
            trust_level = request.trust_level,
            "trust level set by admin override"
        );

        self.get_user_required(target_id).await
    }

    /// Changes the password after verifying the current one, then drops all
    /// sessions so stolen tokens die with the old password.
    pub async fn change_password(
        &self,
        user_id: &str,
        request: &ChangePasswordRequest,
    ) -> ServiceResult<()> {
        validate_request(request)?;

        let user = self.get_user_required(user_id).await?;
        if !Self::verify_password(&request.current_password, &user.password_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }

        let password_hash = Self::hash_password(&request.new_password)?;
        let repo = UserRepository::new(self.pool);
        repo.set_password_hash(user_id, &password_hash).await?;

        SessionRepository::new(self.pool)
            .deactivate_all_for_user(user_id)
            .await?;

        tracing::info!(user_id = %user_id, "password changed, sessions dropped");

        Ok(())
    }

    /// Function to hash a password before storing in database
    pub fn hash_password(password: &str) -> ServiceResult<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))
    }

    /// Function to verify a password against the stored hash
    fn verify_password(password: &str, hash: &str) -> ServiceResult<bool> {
        verify(password, hash).map_err(|e| {
            ServiceError::internal_error(format!("Password verification failed: {}", e))
        })
    }
}
