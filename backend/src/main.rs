//! Main entry point for the CraftGate backend.
//!
//! This file initializes the Axum web server, sets up the database
//! connection, applies migrations, and registers all API routes and
//! middleware. It orchestrates the application's startup and defines its
//! overall structure.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod utils;

use crate::api::common::ApiResponse;
use axum::{Extension, Router, response::Json, routing::get};
use config::Config;
use database::Database;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() {
    init();

    let config = Config::from_env().unwrap();
    let db = Database::new(&config).await.unwrap();
    db.migrate().await.unwrap();
    let pool = db.pool().clone();

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/auth", auth::routes::auth_router())
        .nest("/api/application", api::application::routes::application_router())
        .nest("/api/trust-level", api::trust_level::routes::trust_level_router())
        .nest("/api/reputation", api::reputation::routes::reputation_router())
        .nest("/api/game", api::game::routes::game_router())
        .nest("/api/user", api::user::routes::user_router())
        .nest("/api/token", api::token::routes::token_router())
        .layer(Extension(pool));

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap();

    info!("Starting CraftGate server on port {}", config.server_port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "CraftGate Backend",
            "version": "0.1.0"
        }),
        "Welcome to CraftGate API",
    ))
}
