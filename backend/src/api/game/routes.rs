//! Defines the HTTP routes consumed by the game-server plugin.
//!
//! All routes require an API-token bearer; per-route permissions are
//! checked in the handlers against the token's granted scope.

use crate::api::game::handlers::*;
use crate::auth::middleware::api_token_auth;
use axum::{Router, middleware, routing::post};

pub fn game_router() -> Router {
    Router::new()
        .route("/verify-token", post(verify_game_token))
        .route("/session", post(create_game_session))
        .route("/session/check", post(check_game_session))
        .route("/stats", post(update_stats))
        .layer(middleware::from_fn(api_token_auth))
}
