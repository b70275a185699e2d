//! Domain model types for node persistence

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered node.
///
/// Serializes to the public node object; the token is never serialized.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeRecord {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub track_count: u64,
    pub user_count: u64,
    pub open_registration: bool,
    pub p2p_enabled: bool,
    pub p2p_node_id: Option<String>,
    pub country: Option<String>,
    #[serde(skip_serializing)]
    pub token: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub last_healthy: DateTime<Utc>,
    pub is_online: bool,
    pub down_since: Option<DateTime<Utc>>,
}

/// Aggregate counters over all stored nodes
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub total_nodes: u64,
    pub online_nodes: u64,
    pub total_tracks: u64,
    pub total_users: u64,
}

impl NodeStats {
    pub(crate) fn accumulate(&mut self, is_online: bool, track_count: u64, user_count: u64) {
        self.total_nodes += 1;
        if is_online {
            self.online_nodes += 1;
        }
        self.total_tracks = self.total_tracks.saturating_add(track_count);
        self.total_users = self.total_users.saturating_add(user_count);
    }
}

/// Storage backend selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageMode {
    /// SeaORM over SQLite, MySQL or PostgreSQL
    #[default]
    Sql,
    /// Process-local map, lost on restart
    Memory,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Sql => write!(f, "sql"),
            StorageMode::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" | "db" => Ok(StorageMode::Sql),
            "memory" | "mem" => Ok(StorageMode::Memory),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}

/// Errors raised by persistence backends that callers need to tell apart
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
}
