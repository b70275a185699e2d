//! Rollcall server - HTTP surface of the node registry
//!
//! This crate provides:
//! - actix-web handlers for announce, listing, lookup, removal, stats and liveness
//! - Layered configuration (file, environment, CLI)
//! - Multi-file logging and per-client rate limiting

pub mod api; // API handlers and routes
pub mod error; // Error to HTTP response mapping
pub mod middleware; // HTTP middleware
pub mod model; // Configuration, state and response types
pub mod startup; // Logging and server bootstrap

pub use error::AppError;
pub use model::{AppState, Configuration};
