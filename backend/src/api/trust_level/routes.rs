//! Defines the HTTP routes for the trust-level engine.

use crate::api::trust_level::handlers::*;
use crate::auth::middleware::{moderator_auth, session_auth};
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub fn trust_level_router() -> Router {
    let moderation = Router::new()
        .route("/list", get(list_applications))
        .route("/{id}/review", post(review_application))
        .layer(middleware::from_fn(moderator_auth));

    Router::new()
        .route("/eligibility/{target_level}", get(check_eligibility))
        .route("/apply", post(submit_application))
        .merge(moderation)
        .layer(middleware::from_fn(session_auth))
}
