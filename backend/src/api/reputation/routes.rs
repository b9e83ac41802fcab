//! Defines the HTTP routes for reputation.

use crate::api::reputation::handlers::*;
use crate::auth::middleware::{admin_auth, session_auth};
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub fn reputation_router() -> Router {
    Router::new()
        .route("/{user_id}", get(get_reputation))
        .route("/{user_id}/vote", post(vote))
        .route(
            "/{user_id}/adjust",
            post(admin_adjust).layer(middleware::from_fn(admin_auth)),
        )
        .layer(middleware::from_fn(session_auth))
}
