//! Module for reputation API endpoints.
//!
//! Peer votes, admin adjustments and the per-user reputation summary.

pub mod handlers;
pub mod routes;
