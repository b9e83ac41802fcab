//! Database repository for user management operations.
//!
//! Provides CRUD operations for registered players and staff.

use crate::database::models::{CreateUser, User};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

/// Repository for user database operations.
///
/// Handles all persistence operations for the User entity. Users are never
/// hard-deleted; bans are the soft-disable mechanism.
pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new user.
    ///
    /// Takes an explicit connection so that application approval can create
    /// the user inside the same transaction as the status flip.
    pub async fn create_user(
        &self,
        conn: &mut SqliteConnection,
        user: CreateUser,
    ) -> Result<User> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, nickname, email, password_hash, role, trust_level, is_banned,
                 is_email_verified, email_verify_token, registered_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.nickname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.email_verify_token)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(user)
    }

    /// Retrieves a user by their unique identifier.
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their in-game nickname. The nickname column is
    /// NOCASE, so the lookup is case-insensitive.
    pub async fn get_user_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE nickname = ?")
            .bind(nickname)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their pending email verification token.
    pub async fn get_user_by_verify_token(&self, token: &str) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email_verify_token = ?")
                .bind(token)
                .fetch_optional(self.pool)
                .await?;

        Ok(user)
    }

    /// Checks if a nickname is already taken.
    pub async fn nickname_exists(&self, nickname: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE nickname = ?")
                .bind(nickname)
                .fetch_one(self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Checks if an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn update_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Flags a user as banned with an optional expiry.
    pub async fn set_banned(
        &self,
        id: &str,
        reason: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let rows = sqlx::query(
            r#"
            UPDATE users
            SET is_banned = 1, ban_reason = ?, ban_expires_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reason)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }

    pub async fn clear_ban(&self, id: &str) -> Result<u64> {
        let rows = sqlx::query(
            r#"
            UPDATE users
            SET is_banned = 0, ban_reason = NULL, ban_expires_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }

    /// Writes a new trust level. Takes an explicit connection so the
    /// trust-level review can flip the application status in the same
    /// transaction.
    pub async fn set_trust_level(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        trust_level: i64,
    ) -> Result<u64> {
        let rows = sqlx::query("UPDATE users SET trust_level = ?, updated_at = ? WHERE id = ?")
            .bind(trust_level)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await?
            .rows_affected();

        Ok(rows)
    }

    pub async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Marks the email verified and clears the one-time verify token.
    pub async fn mark_email_verified(&self, id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_email_verified = 1, email_verify_token = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
