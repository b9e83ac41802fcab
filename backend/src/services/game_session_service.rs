//! Game session business logic.
//!
//! Manages the longer-lived binding between a verified in-game player and a
//! user, plus the periodic stat pushes from the game-server plugin.

use crate::api::common::validate_request;
use crate::database::models::{
    CheckGameSessionRequest, CreateGameSessionRequest, GameSession, PlayerStats,
    UpdateStatsRequest,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::game_session_repository::GameSessionRepository;
use crate::repositories::player_stats_repository::PlayerStatsRepository;
use crate::repositories::user_repository::UserRepository;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Lifetime of a game session binding, in days.
const GAME_SESSION_TTL_DAYS: i64 = 7;

pub struct GameSessionService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
}

impl<'a> GameSessionService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Establishes a session binding after a successful game-token
    /// verification. Prior bindings for the same (user, player UUID) pair
    /// are deactivated in the same transaction.
    pub async fn create_session(
        &self,
        request: &CreateGameSessionRequest,
    ) -> ServiceResult<GameSession> {
        validate_request(request)?;

        let user = UserRepository::new(self.pool)
            .get_user_by_nickname(&request.nickname)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.nickname))?;

        let now = Utc::now();
        if user.is_currently_banned(now) {
            return Err(ServiceError::banned(user.ban_reason.clone()));
        }

        let repo = GameSessionRepository::new(self.pool);
        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;

        repo.deactivate_pair(&mut tx, &user.id, &request.player_uuid)
            .await?;
        let session = repo
            .create(
                &mut tx,
                &Uuid::now_v7().to_string(),
                &user.id,
                &request.player_uuid,
                &user.nickname,
                &request.ip,
                request.user_agent.as_deref(),
                now + Duration::days(GAME_SESSION_TTL_DAYS),
            )
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        tracing::info!(
            user_id = %user.id,
            player_uuid = %request.player_uuid,
            "game session established"
        );

        Ok(session)
    }

    /// Validates an existing binding. The session is pinned to the IP it
    /// was created from; nickname, player UUID and IP must all match. The
    /// failure is uniform so callers cannot probe which part mismatched.
    pub async fn check_session(
        &self,
        request: &CheckGameSessionRequest,
    ) -> ServiceResult<GameSession> {
        validate_request(request)?;

        let denied = || ServiceError::unauthenticated("No matching game session");

        let user = UserRepository::new(self.pool)
            .get_user_by_nickname(&request.nickname)
            .await?
            .ok_or_else(denied)?;

        let now = Utc::now();
        if user.is_currently_banned(now) {
            return Err(ServiceError::banned(user.ban_reason.clone()));
        }

        let repo = GameSessionRepository::new(self.pool);
        let session = repo
            .find_active(&user.id, &request.player_uuid)
            .await?
            .ok_or_else(denied)?;

        if session.expires_at <= now || session.ip != request.ip {
            return Err(denied());
        }

        repo.touch_last_login(&session.id, now).await?;

        Ok(session)
    }

    /// Applies stat deltas pushed by the plugin. Playtime accumulated here
    /// feeds the trust-level requirements.
    pub async fn update_stats(&self, request: &UpdateStatsRequest) -> ServiceResult<PlayerStats> {
        validate_request(request)?;

        let user = UserRepository::new(self.pool)
            .get_user_by_nickname(&request.nickname)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.nickname))?;

        let repo = PlayerStatsRepository::new(self.pool);
        let rows = repo
            .apply_deltas(
                &user.id,
                request.playtime_minutes,
                request.deaths,
                request.kills,
            )
            .await?;
        if rows == 0 {
            return Err(ServiceError::not_found("Player stats", &user.id));
        }

        repo.get(&user.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Player stats", &user.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserRole;
    use crate::database::test_support;
    use sqlx::SqlitePool;

    const PLAYER_UUID: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

    fn create_request(ip: &str) -> CreateGameSessionRequest {
        CreateGameSessionRequest {
            nickname: "Steve123".to_string(),
            player_uuid: PLAYER_UUID.to_string(),
            ip: ip.to_string(),
            user_agent: Some("craftgate-plugin/1.0".to_string()),
        }
    }

    fn check_request(ip: &str) -> CheckGameSessionRequest {
        CheckGameSessionRequest {
            nickname: "Steve123".to_string(),
            player_uuid: PLAYER_UUID.to_string(),
            ip: ip.to_string(),
        }
    }

    async fn seed_stats(pool: &SqlitePool, user_id: &str) {
        let mut conn = pool.acquire().await.unwrap();
        PlayerStatsRepository::new(pool)
            .seed(&mut conn, user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn session_checks_require_exact_nickname_uuid_and_ip() {
        let pool = test_support::pool().await;
        test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = GameSessionService::new(&pool);
        service.create_session(&create_request("10.0.0.1")).await.unwrap();

        service.check_session(&check_request("10.0.0.1")).await.unwrap();

        // Same session presented from another address is refused.
        let err = service
            .check_session(&check_request("10.0.0.2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated { .. }));

        let err = service
            .check_session(&CheckGameSessionRequest {
                nickname: "Steve123".to_string(),
                player_uuid: "another-uuid".to_string(),
                ip: "10.0.0.1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn establishing_a_session_deactivates_the_previous_binding() {
        let pool = test_support::pool().await;
        test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = GameSessionService::new(&pool);
        let first = service.create_session(&create_request("10.0.0.1")).await.unwrap();
        let second = service.create_session(&create_request("10.0.0.9")).await.unwrap();
        assert_ne!(first.id, second.id);

        // Only the newest binding remains active, pinned to its own IP.
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM game_sessions WHERE user_id = ? AND is_active = 1",
        )
        .bind(&second.user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(active, 1);

        let err = service
            .check_session(&check_request("10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated { .. }));
        service.check_session(&check_request("10.0.0.9")).await.unwrap();
    }

    #[tokio::test]
    async fn banned_players_cannot_bind_or_check_sessions() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = GameSessionService::new(&pool);
        service.create_session(&create_request("10.0.0.1")).await.unwrap();

        crate::repositories::user_repository::UserRepository::new(&pool)
            .set_banned(&user.id, "griefing", None)
            .await
            .unwrap();

        let err = service
            .check_session(&check_request("10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Banned { .. }));
    }

    #[tokio::test]
    async fn stat_pushes_accumulate() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        seed_stats(&pool, &user.id).await;

        let service = GameSessionService::new(&pool);
        let request = UpdateStatsRequest {
            nickname: "Steve123".to_string(),
            playtime_minutes: 30,
            deaths: 1,
            kills: 4,
        };
        service.update_stats(&request).await.unwrap();
        let stats = service.update_stats(&request).await.unwrap();

        assert_eq!(stats.playtime_minutes, 60);
        assert_eq!(stats.deaths, 2);
        assert_eq!(stats.kills, 8);
    }
}
