//! Database repository for per-player gameplay statistics.

use crate::database::models::PlayerStats;
use anyhow::Result;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

pub struct PlayerStatsRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> PlayerStatsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Seeds the zeroed stats row during account provisioning.
    pub async fn seed(&self, conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO player_stats (user_id, playtime_minutes, deaths, kills, updated_at)
            VALUES (?, 0, 0, 0, ?)
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<PlayerStats>> {
        let stats =
            sqlx::query_as::<_, PlayerStats>("SELECT * FROM player_stats WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        Ok(stats)
    }

    /// Applies whole-number deltas reported by the game-server plugin.
    pub async fn apply_deltas(
        &self,
        user_id: &str,
        playtime_minutes: i64,
        deaths: i64,
        kills: i64,
    ) -> Result<u64> {
        let rows = sqlx::query(
            r#"
            UPDATE player_stats
            SET playtime_minutes = playtime_minutes + ?,
                deaths = deaths + ?,
                kills = kills + ?,
                updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(playtime_minutes)
        .bind(deaths)
        .bind(kills)
        .bind(Utc::now())
        .bind(user_id)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }
}
