//! Module for whitelist application API endpoints.
//!
//! Anonymous submission and status lookup, plus the moderator review
//! screens.

pub mod handlers;
pub mod routes;
