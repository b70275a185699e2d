//! Rollcall Persistence - Node record store
//!
//! This crate provides:
//! - SeaORM entity for the `node_info` table
//! - The `NodePersistence` trait used by the registry and the sweeper
//! - A SQL backend (SQLite/MySQL/PostgreSQL) and an in-memory backend
//! - Domain model types with explicit booleans and UTC timestamps

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

pub use memory::MemoryPersistService;
pub use model::{NodeRecord, NodeStats, PersistenceError, StorageMode};
pub use sql::ExternalDbPersistService;
pub use traits::NodePersistence;
