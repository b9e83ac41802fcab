//! Defines the HTTP routes for whitelist applications.
//!
//! Submission and status lookup are intentionally anonymous: applicants do
//! not have accounts yet. Review and listing require a moderator session.

use crate::api::application::handlers::*;
use crate::auth::middleware::{moderator_auth, session_auth};
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub fn application_router() -> Router {
    let moderation = Router::new()
        .route("/list", get(list_applications))
        .route("/{id}", get(get_application_by_id))
        .route("/{id}/review", post(review_application))
        .layer(middleware::from_fn(moderator_auth))
        .layer(middleware::from_fn(session_auth));

    Router::new()
        .route("/", post(submit_application))
        .route("/status", get(application_status))
        .merge(moderation)
}
