//! Module for core business logic services.
//!
//! This module encapsulates services that perform specific business
//! operations and orchestrate interactions between repositories, such as
//! reviewing applications or adjusting reputation.

pub mod application_service;
pub mod email_service;
pub mod game_session_service;
pub mod reputation_service;
pub mod trust_level_service;
pub mod user_service;
