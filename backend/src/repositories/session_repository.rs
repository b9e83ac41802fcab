//! Database repository for web sessions.

use crate::database::models::{CreateSession, Session};
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct SessionRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_session(&self, session: CreateSession) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at, is_active, ip, user_agent, created_at)
            VALUES (?, ?, ?, ?, 1, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(&session.ip)
        .bind(&session.user_agent)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(session)
    }

    pub async fn get_session_by_id(&self, id: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(session)
    }

    /// Deactivates a single session. Safe to call on an already-inactive
    /// session.
    pub async fn deactivate(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE sessions SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Drops every session a user holds. Used on ban and password change so
    /// the change takes effect on the very next request.
    pub async fn deactivate_all_for_user(&self, user_id: &str) -> Result<u64> {
        let rows = sqlx::query("UPDATE sessions SET is_active = 0 WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?
            .rows_affected();

        Ok(rows)
    }
}
