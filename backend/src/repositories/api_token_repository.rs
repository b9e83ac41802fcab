//! Database repository for plugin API tokens.
//!
//! Only the SHA-256 fingerprint of a token is ever stored; the plaintext
//! secret is shown once at creation and never again.

use crate::database::models::ApiToken;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct ApiTokenRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> ApiTokenRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
        token_hash: &str,
        permissions: &str,
    ) -> Result<ApiToken> {
        let token = sqlx::query_as::<_, ApiToken>(
            r#"
            INSERT INTO api_tokens (id, user_id, name, token_hash, permissions, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .bind(permissions)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(token)
    }

    /// Lookup by fingerprint among non-revoked tokens.
    pub async fn get_active_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>> {
        let token = sqlx::query_as::<_, ApiToken>(
            "SELECT * FROM api_tokens WHERE token_hash = ? AND is_active = 1",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(token)
    }

    pub async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ApiToken>> {
        let tokens =
            sqlx::query_as::<_, ApiToken>("SELECT * FROM api_tokens ORDER BY created_at DESC")
                .fetch_all(self.pool)
                .await?;

        Ok(tokens)
    }

    /// Revocation is an is_active flip and takes effect on the next lookup.
    pub async fn revoke(&self, id: &str) -> Result<u64> {
        let rows = sqlx::query("UPDATE api_tokens SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?
            .rows_affected();

        Ok(rows)
    }
}
