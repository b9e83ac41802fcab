//! Module for the game-server plugin API endpoints.
//!
//! Everything here is called by the external Minecraft server process
//! holding an API token: game-token verification, game sessions and stat
//! pushes.

pub mod handlers;
pub mod routes;
