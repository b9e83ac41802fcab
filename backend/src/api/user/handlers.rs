//! Handler functions for user management endpoints.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::auth::models::{Principal, UserInfo};
use crate::database::models::{BanUserRequest, ChangePasswordRequest, SetTrustLevelRequest, User};
use crate::services::user_service::UserService;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::Json as ResponseJson,
};
use sqlx::SqlitePool;

/// Retrieves a user profile for the moderation screens.
#[axum::debug_handler]
pub async fn get_user_by_id(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<User>>, (StatusCode, String)> {
    let service = UserService::new(&pool);
    match service.get_user_required(&id).await {
        Ok(user) => Ok(ResponseJson(ApiResponse::ok(user))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Bans a user; their sessions die immediately.
#[axum::debug_handler]
pub async fn ban_user(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<BanUserRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, (StatusCode, String)> {
    tracing::warn!(target_user_id = %id, admin_id = %principal.user_id, "ban requested");

    let service = UserService::new(&pool);
    match service.ban_user(&id, &payload).await {
        Ok(user) => Ok(ResponseJson(ApiResponse::success(
            user,
            "User banned successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

#[axum::debug_handler]
pub async fn unban_user(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<User>>, (StatusCode, String)> {
    tracing::info!(target_user_id = %id, admin_id = %principal.user_id, "unban requested");

    let service = UserService::new(&pool);
    match service.unban_user(&id).await {
        Ok(user) => Ok(ResponseJson(ApiResponse::success(
            user,
            "User unbanned successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Admin escape hatch: writes a trust level directly, bypassing the
/// reviewed upgrade path.
#[axum::debug_handler]
pub async fn set_trust_level(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<SetTrustLevelRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, (StatusCode, String)> {
    tracing::warn!(
        target_user_id = %id,
        admin_id = %principal.user_id,
        trust_level = payload.trust_level,
        "trust level override requested"
    );

    let service = UserService::new(&pool);
    match service.set_trust_level(&id, &payload).await {
        Ok(user) => Ok(ResponseJson(ApiResponse::success(
            user,
            "Trust level updated successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Changes the caller's password and drops all of their sessions.
#[axum::debug_handler]
pub async fn change_password(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, (StatusCode, String)> {
    let service = UserService::new(&pool);
    match service.change_password(&principal.user_id, &payload).await {
        Ok(()) => match service.get_user_required(&principal.user_id).await {
            Ok(user) => Ok(ResponseJson(ApiResponse::success(
                UserInfo::from_user(&user),
                "Password changed; please log in again",
            ))),
            Err(error) => Err(service_error_to_http(error)),
        },
        Err(error) => Err(service_error_to_http(error)),
    }
}
