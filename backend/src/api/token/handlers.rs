//! Handler functions for API-token management endpoints.
//!
//! The plaintext secret is returned exactly once, at creation; only its
//! fingerprint is stored.

use crate::api::common::{ApiResponse, service_error_to_http, validate_request};
use crate::auth::models::Principal;
use crate::database::models::{ApiToken, CreateApiTokenRequest};
use crate::errors::ServiceError;
use crate::repositories::api_token_repository::ApiTokenRepository;
use crate::utils::generate_random_string::generate_random_string;
use crate::utils::token_hash::fingerprint;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CreatedApiToken {
    /// The bearer secret. Shown only in this response.
    pub token: String,
    pub api_token: ApiToken,
}

/// Creates a plugin API token owned by the calling admin.
#[axum::debug_handler]
pub async fn create_api_token(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateApiTokenRequest>,
) -> Result<ResponseJson<ApiResponse<CreatedApiToken>>, (StatusCode, String)> {
    validate_request(&payload).map_err(service_error_to_http)?;

    let permissions = serde_json::to_string(&payload.permissions).map_err(|e| {
        service_error_to_http(ServiceError::internal_error(format!(
            "Failed to encode permissions: {}",
            e
        )))
    })?;

    let secret = generate_random_string(48);
    let repo = ApiTokenRepository::new(&pool);
    let api_token = repo
        .create(
            &Uuid::now_v7().to_string(),
            &principal.user_id,
            &payload.name,
            &fingerprint(&secret),
            &permissions,
        )
        .await
        .map_err(|e| service_error_to_http(ServiceError::Database { source: e }))?;

    tracing::info!(
        token_id = %api_token.id,
        admin_id = %principal.user_id,
        "api token created"
    );

    Ok(ResponseJson(ApiResponse::success(
        CreatedApiToken {
            token: secret,
            api_token,
        },
        "API token created; store the secret now, it will not be shown again",
    )))
}

/// Lists all API tokens (fingerprints only, never secrets).
#[axum::debug_handler]
pub async fn list_api_tokens(
    Extension(pool): Extension<SqlitePool>,
) -> Result<ResponseJson<ApiResponse<Vec<ApiToken>>>, (StatusCode, String)> {
    let repo = ApiTokenRepository::new(&pool);
    let tokens = repo
        .list()
        .await
        .map_err(|e| service_error_to_http(ServiceError::Database { source: e }))?;

    Ok(ResponseJson(ApiResponse::ok(tokens)))
}

/// Revokes an API token immediately.
#[axum::debug_handler]
pub async fn revoke_api_token(
    Extension(pool): Extension<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    let repo = ApiTokenRepository::new(&pool);
    let rows = repo
        .revoke(&id)
        .await
        .map_err(|e| service_error_to_http(ServiceError::Database { source: e }))?;

    if rows == 0 {
        return Err(service_error_to_http(ServiceError::not_found(
            "API token",
            &id,
        )));
    }

    tracing::warn!(token_id = %id, admin_id = %principal.user_id, "api token revoked");

    Ok(ResponseJson(ApiResponse::success(
        (),
        "API token revoked successfully",
    )))
}
