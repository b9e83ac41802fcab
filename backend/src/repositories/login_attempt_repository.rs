//! Database repository for the immutable login-attempt log.
//!
//! Every attempt, successful or not, is appended here; the login rate
//! limiter counts recent failures against it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct LoginAttemptRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> LoginAttemptRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, email: &str, ip: &str, success: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO login_attempts (email, ip, success, attempted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(ip)
        .bind(success)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Failed attempts against the email or from the IP since the given
    /// instant. Approximate counting at the window edge is acceptable.
    pub async fn count_recent_failures(
        &self,
        email: &str,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE success = 0 AND attempted_at > ? AND (email = ? OR ip = ?)
            "#,
        )
        .bind(since)
        .bind(email)
        .bind(ip)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
