//! Database repositories.
//!
//! One thin persistence struct per aggregate. Repositories hold a reference
//! to the shared pool; writes that must participate in a caller-owned
//! transaction take an explicit connection instead.

pub mod api_token_repository;
pub mod application_repository;
pub mod game_session_repository;
pub mod game_token_repository;
pub mod login_attempt_repository;
pub mod player_stats_repository;
pub mod reputation_repository;
pub mod session_repository;
pub mod trust_level_repository;
pub mod user_repository;
