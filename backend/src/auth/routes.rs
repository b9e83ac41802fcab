//! Defines the HTTP routes specifically for authentication.
//!
//! These routes handle login, logout, session introspection, game-token
//! issuance and email verification. They are designed to be integrated into
//! the main Axum router.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify-email", get(verify_email))
        .route("/me", get(me).layer(middleware::from_fn(session_auth)))
        .route(
            "/game-token",
            post(issue_game_token).layer(middleware::from_fn(session_auth)),
        )
}
