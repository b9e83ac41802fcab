//! Defines the HTTP routes for user management.

use crate::api::user::handlers::*;
use crate::auth::middleware::{admin_auth, moderator_auth, session_auth};
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub fn user_router() -> Router {
    let admin = Router::new()
        .route("/{id}/ban", post(ban_user))
        .route("/{id}/unban", post(unban_user))
        .route("/{id}/trust-level", post(set_trust_level))
        .layer(middleware::from_fn(admin_auth));

    let moderation = Router::new()
        .route("/{id}", get(get_user_by_id))
        .layer(middleware::from_fn(moderator_auth));

    Router::new()
        .route("/change-password", post(change_password))
        .merge(moderation)
        .merge(admin)
        .layer(middleware::from_fn(session_auth))
}
