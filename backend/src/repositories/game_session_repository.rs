//! Database repository for in-game session bindings.

use crate::database::models::GameSession;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

pub struct GameSessionRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> GameSessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Deactivates prior sessions for a (user, player UUID) pair. Runs on
    /// the establishing transaction so at most one binding stays active.
    pub async fn deactivate_pair(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        player_uuid: &str,
    ) -> Result<u64> {
        let rows = sqlx::query(
            "UPDATE game_sessions SET is_active = 0 WHERE user_id = ? AND player_uuid = ? AND is_active = 1",
        )
        .bind(user_id)
        .bind(player_uuid)
        .execute(conn)
        .await?
        .rows_affected();

        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        user_id: &str,
        player_uuid: &str,
        nickname: &str,
        ip: &str,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<GameSession> {
        let now = Utc::now();
        let session = sqlx::query_as::<_, GameSession>(
            r#"
            INSERT INTO game_sessions
                (id, user_id, player_uuid, nickname, ip, user_agent, expires_at,
                 is_active, last_login_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(player_uuid)
        .bind(nickname)
        .bind(ip)
        .bind(user_agent)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(session)
    }

    pub async fn find_active(
        &self,
        user_id: &str,
        player_uuid: &str,
    ) -> Result<Option<GameSession>> {
        let session = sqlx::query_as::<_, GameSession>(
            r#"
            SELECT * FROM game_sessions
            WHERE user_id = ? AND player_uuid = ? AND is_active = 1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(player_uuid)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    pub async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE game_sessions SET last_login_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
