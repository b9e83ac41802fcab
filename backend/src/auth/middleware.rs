//! Middleware for protecting authenticated routes and handling authorization.
//!
//! Session and API-token middleware resolve the bearer into a `Principal`
//! re-read from the database on every request. Role guards run after, off
//! that fresh Principal, never off token claims.

use crate::api::common::service_error_to_http;
use crate::auth::models::{Principal, TokenScope};
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::errors::ServiceError;
use axum::{
    extract::{Extension, Request},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

fn load_config() -> Result<Config, (StatusCode, String)> {
    Config::from_env().map_err(|e| {
        service_error_to_http(ServiceError::internal_error(format!("Config error: {}", e)))
    })
}

/// Web session authentication middleware. Inserts a fresh `Principal` into
/// the request extensions.
pub async fn session_auth(
    Extension(pool): Extension<SqlitePool>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = bearer_token(&request).ok_or_else(|| {
        service_error_to_http(ServiceError::unauthenticated("Missing bearer token"))
    })?;

    let config = load_config()?;
    let principal = AuthService::new(&pool, &config)
        .validate_session(&token)
        .await
        .map_err(service_error_to_http)?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Plugin authentication middleware. Accepts an API token, or a web session
/// token as a fallback for tooling scripts; inserts the `Principal` and the
/// granted `TokenScope`.
pub async fn api_token_auth(
    Extension(pool): Extension<SqlitePool>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let bearer = bearer_token(&request).ok_or_else(|| {
        service_error_to_http(ServiceError::unauthenticated("Missing bearer token"))
    })?;

    let config = load_config()?;
    let (principal, scope) = AuthService::new(&pool, &config)
        .authenticate_api_token(&bearer)
        .await
        .map_err(service_error_to_http)?;

    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}

/// Moderator-or-admin authorization middleware. Must run after one of the
/// authentication middlewares above.
pub async fn moderator_auth(
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let principal = request.extensions().get::<Principal>().ok_or_else(|| {
        service_error_to_http(ServiceError::unauthenticated("Missing principal"))
    })?;

    if !principal.role.is_moderator() {
        return Err(service_error_to_http(ServiceError::forbidden(
            "Moderator role required",
        )));
    }

    Ok(next.run(request).await)
}

/// Admin authorization middleware. Must run after an authentication
/// middleware.
pub async fn admin_auth(request: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let principal = request.extensions().get::<Principal>().ok_or_else(|| {
        service_error_to_http(ServiceError::unauthenticated("Missing principal"))
    })?;

    if !principal.role.is_admin() {
        return Err(service_error_to_http(ServiceError::forbidden(
            "Admin role required",
        )));
    }

    Ok(next.run(request).await)
}

/// Permission check for plugin endpoints, run inside handlers against the
/// scope the API-token middleware granted.
pub fn require_permission(scope: &TokenScope, permission: &str) -> Result<(), (StatusCode, String)> {
    if scope.has_permission(permission) {
        Ok(())
    } else {
        Err(service_error_to_http(ServiceError::forbidden(format!(
            "Token lacks the '{}' permission",
            permission
        ))))
    }
}
