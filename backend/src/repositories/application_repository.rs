//! Database repository for whitelist applications.

use crate::api::common::PaginationFilter;
use crate::database::models::{Application, ApplicationStatus, SubmitApplicationRequest};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

pub struct ApplicationRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> ApplicationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        id: &str,
        request: &SubmitApplicationRequest,
        submitted_ip: &str,
    ) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications
                (id, nickname, email, discord, motivation, plans, status, submitted_ip, submitted_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.nickname)
        .bind(&request.email)
        .bind(&request.discord)
        .bind(&request.motivation)
        .bind(&request.plans)
        .bind(submitted_ip)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(application)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Application>> {
        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(application)
    }

    /// Most recent application for an email, any status. Backs the
    /// anonymous status lookup.
    pub async fn latest_by_email(&self, email: &str) -> Result<Option<Application>> {
        let application = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE email = ? ORDER BY submitted_at DESC LIMIT 1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(application)
    }

    /// True when a pending or approved application exists for the email or
    /// the nickname.
    pub async fn active_exists(&self, email: &str, nickname: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM applications
            WHERE status IN ('pending', 'approved') AND (email = ? OR nickname = ?)
            "#,
        )
        .bind(email)
        .bind(nickname)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Number of applications filed from an IP since the given instant.
    pub async fn count_recent_by_ip(&self, ip: &str, since: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE submitted_ip = ? AND submitted_at > ?",
        )
        .bind(ip)
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// True when the user was provisioned through an approved application,
    /// i.e. has server access.
    pub async fn has_approved_for_user(&self, user_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE user_id = ? AND status = 'approved'",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        pagination: &PaginationFilter,
    ) -> Result<Vec<Application>> {
        let limit = pagination.limit() as i64;
        let offset = pagination.offset() as i64;

        let applications = match status {
            Some(status) => {
                sqlx::query_as::<_, Application>(
                    r#"
                    SELECT * FROM applications WHERE status = ?
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
                sqlx::query_as::<_, Application>(
                    "SELECT * FROM applications ORDER BY submitted_at DESC LIMIT ? OFFSET ?",
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
                sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE status = ?")
                    .bind(status)
                    .fetch_one(self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM applications")
                    .fetch_one(self.pool)
                    .await?
            }
        };

        Ok(count as u64)
    }

    /// Flips a pending application to its terminal status. The status guard
    /// makes a concurrent second review lose the race and see zero rows.
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
            UPDATE applications
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

    /// Links an approved application to the user it provisioned.
    pub async fn link_user(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        user_id: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE applications SET user_id = ? WHERE id = ?")
            .bind(user_id)
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }
}
