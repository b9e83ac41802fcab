//! Module for user management API endpoints.
//!
//! Self-service password changes plus the admin/moderator screens: profile
//! lookup, bans and the trust-level override.

pub mod handlers;
pub mod routes;
