//! Persistence trait for the node record store
//!
//! Implementations must make every write atomic for the record it touches.
//! Merging of fields is the caller's job: `node_update` replaces the whole row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{NodeRecord, NodeStats};

/// Node record storage operations
#[async_trait]
pub trait NodePersistence: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with [`crate::PersistenceError::DuplicateKey`] when the id,
    /// domain or token is already taken.
    async fn node_insert(&self, record: &NodeRecord) -> anyhow::Result<()>;

    /// Replace the stored record with the same id.
    ///
    /// Returns `false` if the record no longer exists.
    async fn node_update(&self, record: &NodeRecord) -> anyhow::Result<bool>;

    async fn node_find_by_id(&self, id: &str) -> anyhow::Result<Option<NodeRecord>>;

    async fn node_find_by_domain(&self, domain: &str) -> anyhow::Result<Option<NodeRecord>>;

    async fn node_find_by_token(&self, token: &str) -> anyhow::Result<Option<NodeRecord>>;

    /// List nodes, online first, then by track count descending, then by domain.
    async fn node_list(&self, include_offline: bool) -> anyhow::Result<Vec<NodeRecord>>;

    /// Delete a record by id
    async fn node_delete(&self, id: &str) -> anyhow::Result<bool>;

    /// Delete a record only while it is offline with `down_since <= cutoff`.
    ///
    /// The check and the delete happen in one step, so a record brought back
    /// online by a concurrent heartbeat is left alone.
    async fn node_delete_if_down_since(
        &self,
        id: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// Delete the record matching both domain and token
    async fn node_delete_by_domain_and_token(
        &self,
        domain: &str,
        token: &str,
    ) -> anyhow::Result<bool>;

    /// Aggregate counters over all stored nodes
    async fn node_stats(&self) -> anyhow::Result<NodeStats>;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
