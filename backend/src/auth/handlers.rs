//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for login, logout, session
//! introspection, game-token issuance and email verification, and interact
//! with `auth::service` for the core business logic.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::errors::ServiceError;
use crate::services::user_service::UserService;
use axum::{
    extract::{ConnectInfo, Extension, Json, Query},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::Json as ResponseJson,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

fn load_config() -> Result<Config, (StatusCode, String)> {
    Config::from_env().map_err(|e| {
        service_error_to_http(ServiceError::internal_error(format!("Config error: {}", e)))
    })
}

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<LoginResponse>>, (StatusCode, String)> {
    let config = load_config()?;
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let auth_service = AuthService::new(&pool, &config);
    match auth_service
        .login(payload, &addr.ip().to_string(), user_agent)
        .await
    {
        Ok(response) => Ok(ResponseJson(ApiResponse::success(
            response,
            "Logged in successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle logout request. Idempotent by design.
#[axum::debug_handler]
pub async fn logout(
    Extension(pool): Extension<SqlitePool>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| {
            service_error_to_http(ServiceError::unauthenticated("Missing bearer token"))
        })?;

    let config = load_config()?;
    let auth_service = AuthService::new(&pool, &config);
    match auth_service.logout(token).await {
        Ok(()) => Ok(ResponseJson(ApiResponse::success(
            (),
            "Logged out successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Returns the caller's fresh profile.
#[axum::debug_handler]
pub async fn me(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, (StatusCode, String)> {
    let user_service = UserService::new(&pool);
    match user_service.get_user_required(&principal.user_id).await {
        Ok(user) => Ok(ResponseJson(ApiResponse::ok(UserInfo::from_user(&user)))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Issues a one-time game login token for the caller.
#[axum::debug_handler]
pub async fn issue_game_token(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
) -> Result<ResponseJson<ApiResponse<IssuedGameToken>>, (StatusCode, String)> {
    let config = load_config()?;

    tracing::info!(user_id = %principal.user_id, "game token requested");

    let auth_service = AuthService::new(&pool, &config);
    match auth_service.issue_game_login_token(&principal.user_id).await {
        Ok(issued) => Ok(ResponseJson(ApiResponse::success(
            issued,
            "Game login token issued; it is valid for 15 minutes and shown only once",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Consumes an emailed verification token.
#[axum::debug_handler]
pub async fn verify_email(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, (StatusCode, String)> {
    let config = load_config()?;

    let auth_service = AuthService::new(&pool, &config);
    match auth_service.verify_email(&query.token).await {
        Ok(user) => Ok(ResponseJson(ApiResponse::success(
            user,
            "Email verified successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}
