//! In-memory persistence backend
//!
//! Records live in a single map guarded by a `parking_lot::RwLock`. Nothing
//! survives a restart. Used for development and tests.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::model::{NodeRecord, NodeStats, PersistenceError};
use crate::traits::NodePersistence;

/// Process-local node store
#[derive(Default)]
pub struct MemoryPersistService {
    nodes: RwLock<HashMap<String, NodeRecord>>,
}

impl MemoryPersistService {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Online first, then track count descending, then domain ascending
fn listing_order(a: &NodeRecord, b: &NodeRecord) -> Ordering {
    b.is_online
        .cmp(&a.is_online)
        .then_with(|| b.track_count.cmp(&a.track_count))
        .then_with(|| a.domain.cmp(&b.domain))
}

#[async_trait]
impl NodePersistence for MemoryPersistService {
    async fn node_insert(&self, record: &NodeRecord) -> anyhow::Result<()> {
        let mut nodes = self.nodes.write();

        if nodes.contains_key(&record.id) {
            return Err(PersistenceError::DuplicateKey(format!("id {}", record.id)).into());
        }
        if let Some(existing) = nodes
            .values()
            .find(|n| n.domain == record.domain || n.token == record.token)
        {
            let key = if existing.domain == record.domain {
                format!("domain {}", record.domain)
            } else {
                "token".to_string()
            };
            return Err(PersistenceError::DuplicateKey(key).into());
        }

        nodes.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn node_update(&self, record: &NodeRecord) -> anyhow::Result<bool> {
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn node_find_by_id(&self, id: &str) -> anyhow::Result<Option<NodeRecord>> {
        Ok(self.nodes.read().get(id).cloned())
    }

    async fn node_find_by_domain(&self, domain: &str) -> anyhow::Result<Option<NodeRecord>> {
        Ok(self
            .nodes
            .read()
            .values()
            .find(|n| n.domain == domain)
            .cloned())
    }

    async fn node_find_by_token(&self, token: &str) -> anyhow::Result<Option<NodeRecord>> {
        Ok(self
            .nodes
            .read()
            .values()
            .find(|n| n.token == token)
            .cloned())
    }

    async fn node_list(&self, include_offline: bool) -> anyhow::Result<Vec<NodeRecord>> {
        let mut list: Vec<NodeRecord> = self
            .nodes
            .read()
            .values()
            .filter(|n| include_offline || n.is_online)
            .cloned()
            .collect();
        list.sort_by(listing_order);
        Ok(list)
    }

    async fn node_delete(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.nodes.write().remove(id).is_some())
    }

    async fn node_delete_if_down_since(
        &self,
        id: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut nodes = self.nodes.write();
        let expired = nodes
            .get(id)
            .is_some_and(|n| !n.is_online && n.down_since.is_some_and(|d| d <= cutoff));

        Ok(expired && nodes.remove(id).is_some())
    }

    async fn node_delete_by_domain_and_token(
        &self,
        domain: &str,
        token: &str,
    ) -> anyhow::Result<bool> {
        let mut nodes = self.nodes.write();
        let id = nodes
            .values()
            .find(|n| n.domain == domain && n.token == token)
            .map(|n| n.id.clone());

        Ok(match id {
            Some(id) => nodes.remove(&id).is_some(),
            None => false,
        })
    }

    async fn node_stats(&self) -> anyhow::Result<NodeStats> {
        let nodes = self.nodes.read();
        let mut stats = NodeStats::default();
        for node in nodes.values() {
            stats.accumulate(node.is_online, node.track_count, node.user_count);
        }
        Ok(stats)
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
