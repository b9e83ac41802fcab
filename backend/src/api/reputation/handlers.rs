//! Handler functions for reputation endpoints.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::auth::models::Principal;
use crate::database::models::{AdjustReputationRequest, ReputationEvent, VoteRequest};
use crate::services::reputation_service::{ReputationService, ReputationSummary};
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::Json as ResponseJson,
};
use sqlx::SqlitePool;

/// Returns the cached aggregate and recent ledger entries for a user.
#[axum::debug_handler]
pub async fn get_reputation(
    Extension(pool): Extension<SqlitePool>,
    Path(user_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<ReputationSummary>>, (StatusCode, String)> {
    let service = ReputationService::new(&pool);
    match service.summary(&user_id).await {
        Ok(summary) => Ok(ResponseJson(ApiResponse::ok(summary))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Casts a peer vote (±1) on another user.
#[axum::debug_handler]
pub async fn vote(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<ResponseJson<ApiResponse<ReputationEvent>>, (StatusCode, String)> {
    let service = ReputationService::new(&pool);
    match service.vote(&user_id, &principal.user_id, &payload).await {
        Ok(event) => Ok(ResponseJson(ApiResponse::success(
            event,
            "Vote recorded successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Applies an admin reputation adjustment (up to ±100).
#[axum::debug_handler]
pub async fn admin_adjust(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    Json(payload): Json<AdjustReputationRequest>,
) -> Result<ResponseJson<ApiResponse<ReputationEvent>>, (StatusCode, String)> {
    tracing::info!(
        target_user_id = %user_id,
        admin_id = %principal.user_id,
        delta = payload.delta,
        "admin reputation adjustment"
    );

    let service = ReputationService::new(&pool);
    match service
        .admin_adjust(&user_id, &principal.user_id, &payload)
        .await
    {
        Ok(event) => Ok(ResponseJson(ApiResponse::success(
            event,
            "Reputation adjusted successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}
