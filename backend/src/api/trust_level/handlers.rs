//! Handler functions for trust-level endpoints.

use crate::api::common::{
    ApiResponse, PaginatedData, PaginationFilter, PaginationMeta, service_error_to_http,
};
use crate::auth::models::Principal;
use crate::database::models::{
    ApplicationStatus, ReviewRequest, SubmitTrustLevelRequest, TrustLevelApplication,
};
use crate::services::trust_level_service::{EligibilityReport, TrustLevelService};
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde::Deserialize;
use sqlx::SqlitePool;

#[derive(Debug, Deserialize)]
pub struct TrustLevelListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<ApplicationStatus>,
}

/// Reports whether the caller meets the requirements for a target level,
/// and which requirements are still unmet. Pure read; backs the progress UI.
#[axum::debug_handler]
pub async fn check_eligibility(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(target_level): Path<i64>,
) -> Result<ResponseJson<ApiResponse<EligibilityReport>>, (StatusCode, String)> {
    let service = TrustLevelService::new(&pool);
    match service
        .check_eligibility(&principal.user_id, target_level)
        .await
    {
        Ok(report) => Ok(ResponseJson(ApiResponse::ok(report))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Files an upgrade application for the caller.
#[axum::debug_handler]
pub async fn submit_application(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<SubmitTrustLevelRequest>,
) -> Result<ResponseJson<ApiResponse<TrustLevelApplication>>, (StatusCode, String)> {
    let service = TrustLevelService::new(&pool);
    match service.submit_application(&principal.user_id, &payload).await {
        Ok(application) => Ok(ResponseJson(ApiResponse::success(
            application,
            "Trust level application submitted successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Retrieves upgrade applications, optionally filtered by status.
#[axum::debug_handler]
pub async fn list_applications(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<TrustLevelListQuery>,
) -> Result<ResponseJson<ApiResponse<PaginatedData<TrustLevelApplication>>>, (StatusCode, String)>
{
    let pagination = PaginationFilter {
        page: query.page,
        per_page: query.per_page,
    };

    let service = TrustLevelService::new(&pool);
    match service.list_applications(query.status, &pagination).await {
        Ok((applications, total)) => {
            let meta = PaginationMeta::from_filter(&pagination, total);
            Ok(ResponseJson(ApiResponse::paginated(
                PaginatedData::new(applications, total),
                meta,
                "Trust level applications retrieved successfully",
            )))
        }
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Reviews a pending upgrade application.
#[axum::debug_handler]
pub async fn review_application(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<ResponseJson<ApiResponse<TrustLevelApplication>>, (StatusCode, String)> {
    tracing::info!(
        application_id = %id,
        reviewer_id = %principal.user_id,
        "reviewing trust level application"
    );

    let service = TrustLevelService::new(&pool);
    match service
        .review_application(&id, &principal.user_id, &payload)
        .await
    {
        Ok(application) => Ok(ResponseJson(ApiResponse::success(
            application,
            "Trust level application reviewed successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}
