//! Handler functions for whitelist application endpoints.

use crate::api::common::{
    ApiResponse, PaginatedData, PaginationFilter, PaginationMeta, service_error_to_http,
};
use crate::auth::models::Principal;
use crate::config::Config;
use crate::database::models::{
    Application, ApplicationStatus, ReviewRequest, SubmitApplicationRequest,
};
use crate::errors::ServiceError;
use crate::services::application_service::{ApplicationService, ApplicationStatusView};
use axum::{
    extract::{ConnectInfo, Extension, Json, Path, Query},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<ApplicationStatus>,
}

fn load_config() -> Result<Config, (StatusCode, String)> {
    Config::from_env().map_err(|e| {
        service_error_to_http(ServiceError::internal_error(format!("Config error: {}", e)))
    })
}

/// Handle anonymous application submission.
#[axum::debug_handler]
pub async fn submit_application(
    Extension(pool): Extension<SqlitePool>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<SubmitApplicationRequest>,
) -> Result<ResponseJson<ApiResponse<Application>>, (StatusCode, String)> {
    let config = load_config()?;

    let service = ApplicationService::new(&pool, &config);
    match service
        .submit_application(&payload, &addr.ip().to_string())
        .await
    {
        Ok(application) => Ok(ResponseJson(ApiResponse::success(
            application,
            "Application submitted successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Anonymous status lookup by email, for applicants without accounts.
#[axum::debug_handler]
pub async fn application_status(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<StatusQuery>,
) -> Result<ResponseJson<ApiResponse<ApplicationStatusView>>, (StatusCode, String)> {
    let config = load_config()?;

    let service = ApplicationService::new(&pool, &config);
    match service.status_by_email(&query.email).await {
        Ok(view) => Ok(ResponseJson(ApiResponse::ok(view))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Retrieves all applications, optionally filtered by status.
#[axum::debug_handler]
pub async fn list_applications(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<ResponseJson<ApiResponse<PaginatedData<Application>>>, (StatusCode, String)> {
    let config = load_config()?;
    let pagination = PaginationFilter {
        page: query.page,
        per_page: query.per_page,
    };

    let service = ApplicationService::new(&pool, &config);
    match service.list_applications(query.status, &pagination).await {
        Ok((applications, total)) => {
            let meta = PaginationMeta::from_filter(&pagination, total);
            Ok(ResponseJson(ApiResponse::paginated(
                PaginatedData::new(applications, total),
                meta,
                "Applications retrieved successfully",
            )))
        }
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Retrieves an application by its ID.
#[axum::debug_handler]
pub async fn get_application_by_id(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<Application>>, (StatusCode, String)> {
    let config = load_config()?;

    let service = ApplicationService::new(&pool, &config);
    match service.get_application_required(&id).await {
        Ok(application) => Ok(ResponseJson(ApiResponse::ok(application))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Reviews a pending application. Approval provisions the account.
#[axum::debug_handler]
pub async fn review_application(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<ResponseJson<ApiResponse<Application>>, (StatusCode, String)> {
    let config = load_config()?;

    tracing::info!(application_id = %id, reviewer_id = %principal.user_id, "reviewing application");

    let service = ApplicationService::new(&pool, &config);
    match service
        .review_application(&id, &principal.user_id, &payload)
        .await
    {
        Ok(application) => Ok(ResponseJson(ApiResponse::success(
            application,
            "Application reviewed successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}
