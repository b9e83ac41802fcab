//! Module for database connection setup and common utilities.
//!
//! This module is responsible for initializing the database connection pool,
//! applying embedded migrations and providing a central point for
//! database-related configurations and helpers.

use crate::config::Config;
use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::time::Duration;

pub mod models;

pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Initializes the database connection pool.
    pub async fn new(config: &Config) -> Result<Self> {
        let database_url = &config.database_url;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Database {
            pool: self.pool.clone(),
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! Shared helpers for service tests: an in-memory database with the
    //! schema applied, plus factories for the rows most tests need.

    use crate::config::Config;
    use crate::database::models::{CreateUser, User, UserRole};
    use crate::repositories::user_repository::UserRepository;
    use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
    use uuid::Uuid;

    pub async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        sqlx::migrate!().run(&pool).await.expect("migrations");
        pool
    }

    pub fn config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            jwt_secret: "test-secret".to_string(),
            session_ttl_hours: 24,
            session_remember_ttl_days: 30,
            server_port: 0,
            base_url: "http://localhost:3000".to_string(),
            email: None,
        }
    }

    pub async fn create_user(pool: &SqlitePool, nickname: &str, role: UserRole) -> User {
        let repo = UserRepository::new(pool);
        let mut conn = pool.acquire().await.expect("connection");
        repo.create_user(
            &mut conn,
            CreateUser {
                id: Uuid::now_v7().to_string(),
                nickname: nickname.to_string(),
                email: format!("{}@example.com", nickname.to_lowercase()),
                password_hash: bcrypt::hash("password123", 4).expect("hash"),
                role,
                email_verify_token: None,
            },
        )
        .await
        .expect("create user")
    }
}
