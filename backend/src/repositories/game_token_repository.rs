//! Database repository for one-time game login tokens.

use crate::database::models::GameLoginToken;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

pub struct GameTokenRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> GameTokenRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Marks every unused token of a user as used. Runs on the issuing
    /// transaction so at most one live token exists per user.
    pub async fn invalidate_unused(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> Result<u64> {
        let rows =
            sqlx::query("UPDATE game_login_tokens SET is_used = 1 WHERE user_id = ? AND is_used = 0")
                .bind(user_id)
                .execute(conn)
                .await?
                .rows_affected();

        Ok(rows)
    }

    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<GameLoginToken> {
        let token = sqlx::query_as::<_, GameLoginToken>(
            r#"
            INSERT INTO game_login_tokens (id, user_id, token_hash, expires_at, is_used, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(token)
    }

    pub async fn get_by_hash(&self, token_hash: &str) -> Result<Option<GameLoginToken>> {
        let token =
            sqlx::query_as::<_, GameLoginToken>("SELECT * FROM game_login_tokens WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(self.pool)
                .await?;

        Ok(token)
    }

    /// Single-shot consumption. The is_used guard makes a second concurrent
    /// consumer lose the race and see zero affected rows.
    pub async fn consume(&self, id: &str) -> Result<u64> {
        let rows = sqlx::query("UPDATE game_login_tokens SET is_used = 1 WHERE id = ? AND is_used = 0")
            .bind(id)
            .execute(self.pool)
            .await?
            .rows_affected();

        Ok(rows)
    }
}
