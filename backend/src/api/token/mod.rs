//! Module for API-token management endpoints.
//!
//! Admin-only creation, listing and revocation of the long-lived tokens
//! held by the game-server plugin.

pub mod handlers;
pub mod routes;
