//! Rollcall Registry - node lifecycle
//!
//! This crate provides:
//! - Remote probes against a node's `/healthz` and `/api/nodeinfo`
//! - Announce handling (registration and token-authenticated heartbeats)
//! - Field merge rules as pure functions
//! - The periodic health sweeper with offline tracking and eviction

pub mod merge;
pub mod probe;
pub mod service;
pub mod sweeper;

pub use probe::{HttpNodeProbe, NodeInfo, NodeProbe, ProbeConfig};
pub use service::{AnnounceOutcome, AnnounceRequest, RegistryService};
pub use sweeper::{HealthSweeper, SweepReport, SweeperConfig, SweeperHandle};
