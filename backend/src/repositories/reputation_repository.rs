//! Database repository for the reputation ledger and its cached aggregate.
//!
//! The ledger is append-only; the reputation_records row is a cache of the
//! per-user delta sum and is only ever written in the same transaction as a
//! ledger append.

use crate::database::models::{ReputationEvent, ReputationRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

pub struct ReputationRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> ReputationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Seeds the zeroed aggregate row during account provisioning.
    pub async fn seed(&self, conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reputation_records
                (user_id, reputation_score, positive_votes, negative_votes, updated_at)
            VALUES (?, 0, 0, 0, ?)
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<ReputationRecord>> {
        let record = sqlx::query_as::<_, ReputationRecord>(
            "SELECT * FROM reputation_records WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn append_event(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        voter_id: Option<&str>,
        target_user_id: &str,
        delta: i64,
        reason: &str,
        is_admin_action: bool,
    ) -> Result<ReputationEvent> {
        let event = sqlx::query_as::<_, ReputationEvent>(
            r#"
            INSERT INTO reputation_events
                (id, voter_id, target_user_id, delta, reason, is_admin_action, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(voter_id)
        .bind(target_user_id)
        .bind(delta)
        .bind(reason)
        .bind(is_admin_action)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Folds a delta into the cached aggregate. Upserts so targets
    /// provisioned before the aggregate table existed still get a row.
    pub async fn apply_delta(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        delta: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reputation_records
                (user_id, reputation_score, positive_votes, negative_votes, updated_at)
            VALUES (?, ?, CASE WHEN ? > 0 THEN 1 ELSE 0 END, CASE WHEN ? < 0 THEN 1 ELSE 0 END, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                reputation_score = reputation_score + excluded.reputation_score,
                positive_votes = positive_votes + excluded.positive_votes,
                negative_votes = negative_votes + excluded.negative_votes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .bind(delta)
        .bind(delta)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Timestamp of the most recent non-admin vote from a voter on a target.
    pub async fn last_vote_at(
        &self,
        voter_id: &str,
        target_user_id: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT created_at FROM reputation_events
            WHERE voter_id = ? AND target_user_id = ? AND is_admin_action = 0
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(voter_id)
        .bind(target_user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(at)
    }

    pub async fn events_for(&self, target_user_id: &str, limit: i64) -> Result<Vec<ReputationEvent>> {
        let events = sqlx::query_as::<_, ReputationEvent>(
            r#"
            SELECT * FROM reputation_events
            WHERE target_user_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(target_user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(events)
    }

    /// Replays the ledger for a user. The cached aggregate must always
    /// equal this sum.
    pub async fn sum_deltas(&self, user_id: &str) -> Result<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM reputation_events WHERE target_user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(sum)
    }
}
