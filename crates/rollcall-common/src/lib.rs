//! Rollcall Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used across all Rollcall components:
//! - Error taxonomy (`RollcallError`)
//! - Domain normalization and validation helpers
//! - Common constants

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::RollcallError;
pub use utils::{host_of, is_loopback_host, is_valid_domain, normalize_domain};

/// Path probed on a node to confirm it is reachable
pub const HEALTH_PATH: &str = "/healthz";

/// Path queried on a node for its self-reported metadata
pub const NODE_INFO_PATH: &str = "/api/nodeinfo";

/// User agent attached to every outbound probe
pub const DEFAULT_USER_AGENT: &str = concat!("rollcall-registry/", env!("CARGO_PKG_VERSION"));
