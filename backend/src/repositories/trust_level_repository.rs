//! Database repository for trust-level upgrade applications.

use crate::api::common::PaginationFilter;
use crate::database::models::{ApplicationStatus, TrustLevelApplication};
use anyhow::Result;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

pub struct TrustLevelRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

pub struct CreateTrustLevelApplication {
    pub id: String,
    pub user_id: String,
    pub current_level: i64,
    pub requested_level: i64,
    pub motivation: String,
    pub playtime_minutes: i64,
    pub reputation_score: i64,
    pub email_verified: bool,
}

impl<'a> TrustLevelRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        application: CreateTrustLevelApplication,
    ) -> Result<TrustLevelApplication> {
        let application = sqlx::query_as::<_, TrustLevelApplication>(
            r#"
            INSERT INTO trust_level_applications
                (id, user_id, current_level, requested_level, motivation,
                 playtime_minutes, reputation_score, email_verified, status, submitted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            RETURNING *
            "#,
        )
        .bind(&application.id)
        .bind(&application.user_id)
        .bind(application.current_level)
        .bind(application.requested_level)
        .bind(&application.motivation)
        .bind(application.playtime_minutes)
        .bind(application.reputation_score)
        .bind(application.email_verified)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(application)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<TrustLevelApplication>> {
        let application = sqlx::query_as::<_, TrustLevelApplication>(
            "SELECT * FROM trust_level_applications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(application)
    }

    pub async fn pending_for_user(&self, user_id: &str) -> Result<Option<TrustLevelApplication>> {
        let application = sqlx::query_as::<_, TrustLevelApplication>(
            "SELECT * FROM trust_level_applications WHERE user_id = ? AND status = 'pending'",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(application)
    }

    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        pagination: &PaginationFilter,
    ) -> Result<Vec<TrustLevelApplication>> {
        let limit = pagination.limit() as i64;
        let offset = pagination.offset() as i64;

        let applications = match status {
            Some(status) => {
                sqlx::query_as::<_, TrustLevelApplication>(
                    r#"
                    SELECT * FROM trust_level_applications WHERE status = ?
                    ORDER BY submitted_at DESC LIMIT ? OFFSET ?
                    "#,
                )
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, TrustLevelApplication>(
                    "SELECT * FROM trust_level_applications ORDER BY submitted_at DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(applications)
    }

    pub async fn count(&self, status: Option<ApplicationStatus>) -> Result<u64> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM trust_level_applications WHERE status = ?")
                    .bind(status)
                    .fetch_one(self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM trust_level_applications")
                    .fetch_one(self.pool)
                    .await?
            }
        };

        Ok(count as u64)
    }

    /// Flips a pending request to its terminal status, guarded against
    /// concurrent double review.
    pub async fn mark_reviewed(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: ApplicationStatus,
        reviewer_id: &str,
        comment: Option<&str>,
    ) -> Result<u64> {
        let rows = sqlx::query(
            r#"
            UPDATE trust_level_applications
            SET status = ?, reviewer_id = ?, review_comment = ?, reviewed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status)
        .bind(reviewer_id)
        .bind(comment)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?
        .rows_affected();

        Ok(rows)
    }
}
