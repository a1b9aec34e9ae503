// Codenames client library: socket supervision, session directory, config and
// the app loop that drives a `codenames_core::session::GameSession`.

pub mod app;
pub mod config;
pub mod connection;
pub mod directory;
pub mod render;
