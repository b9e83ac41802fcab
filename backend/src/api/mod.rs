//! Central module for organizing the application's main API endpoints.
//!
//! This module acts as a top-level container for different API domains,
//! such as whitelist applications, trust levels, reputation and the
//! plugin-facing game endpoints, excluding core authentication routes which
//! are handled separately.

pub mod application;
pub mod common;
pub mod game;
pub mod reputation;
pub mod token;
pub mod trust_level;
pub mod user;
