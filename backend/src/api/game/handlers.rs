//! Handler functions for the game-server plugin endpoints.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::auth::middleware::require_permission;
use crate::auth::models::{Principal, TokenScope};
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::database::models::{
    CheckGameSessionRequest, CreateGameSessionRequest, GameSession, PlayerStats,
    UpdateStatsRequest, VerifyGameTokenRequest,
};
use crate::errors::ServiceError;
use crate::services::game_session_service::GameSessionService;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::Json as ResponseJson,
};
use sqlx::SqlitePool;

fn load_config() -> Result<Config, (StatusCode, String)> {
    Config::from_env().map_err(|e| {
        service_error_to_http(ServiceError::internal_error(format!("Config error: {}", e)))
    })
}

/// Exchanges a one-time game login token for the owning principal. The
/// token is consumed whether or not the plugin completes its own flow.
#[axum::debug_handler]
pub async fn verify_game_token(
    Extension(pool): Extension<SqlitePool>,
    Extension(scope): Extension<TokenScope>,
    Json(payload): Json<VerifyGameTokenRequest>,
) -> Result<ResponseJson<ApiResponse<Principal>>, (StatusCode, String)> {
    require_permission(&scope, "game:verify")?;
    let config = load_config()?;

    let auth_service = AuthService::new(&pool, &config);
    match auth_service.verify_game_login_token(&payload).await {
        Ok(principal) => Ok(ResponseJson(ApiResponse::success(
            principal,
            "Game login token verified",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Establishes a 7-day binding between an in-game player and a user.
#[axum::debug_handler]
pub async fn create_game_session(
    Extension(pool): Extension<SqlitePool>,
    Extension(scope): Extension<TokenScope>,
    Json(payload): Json<CreateGameSessionRequest>,
) -> Result<ResponseJson<ApiResponse<GameSession>>, (StatusCode, String)> {
    require_permission(&scope, "game:session")?;

    let service = GameSessionService::new(&pool);
    match service.create_session(&payload).await {
        Ok(session) => Ok(ResponseJson(ApiResponse::success(
            session,
            "Game session established",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Validates an existing binding; requires an exact nickname+uuid+ip match.
#[axum::debug_handler]
pub async fn check_game_session(
    Extension(pool): Extension<SqlitePool>,
    Extension(scope): Extension<TokenScope>,
    Json(payload): Json<CheckGameSessionRequest>,
) -> Result<ResponseJson<ApiResponse<GameSession>>, (StatusCode, String)> {
    require_permission(&scope, "game:session")?;

    let service = GameSessionService::new(&pool);
    match service.check_session(&payload).await {
        Ok(session) => Ok(ResponseJson(ApiResponse::success(
            session,
            "Game session is valid",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Applies playtime/death/kill deltas reported by the plugin.
#[axum::debug_handler]
pub async fn update_stats(
    Extension(pool): Extension<SqlitePool>,
    Extension(scope): Extension<TokenScope>,
    Json(payload): Json<UpdateStatsRequest>,
) -> Result<ResponseJson<ApiResponse<PlayerStats>>, (StatusCode, String)> {
    require_permission(&scope, "stats:write")?;

    let service = GameSessionService::new(&pool);
    match service.update_stats(&payload).await {
        Ok(stats) => Ok(ResponseJson(ApiResponse::success(
            stats,
            "Player stats updated",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}
