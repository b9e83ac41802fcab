//! Defines the HTTP routes for API-token management.

use crate::api::token::handlers::*;
use crate::auth::middleware::{admin_auth, session_auth};
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

pub fn token_router() -> Router {
    Router::new()
        .route("/", post(create_api_token))
        .route("/", get(list_api_tokens))
        .route("/{id}", delete(revoke_api_token))
        .layer(middleware::from_fn(admin_auth))
        .layer(middleware::from_fn(session_auth))
}
