//! SQL-based persistence backend (SQLite/MySQL/PostgreSQL via SeaORM)
//!
//! The table keeps integer flags and naive UTC timestamps. The mapping
//! functions below are the only place that converts them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr,
};
use tracing::debug;

use crate::entity::node_info;
use crate::model::{NodeRecord, NodeStats, PersistenceError};
use crate::traits::NodePersistence;

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection`. The schema must already exist
/// (see the `rollcall-migration` crate).
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[inline]
fn to_flag(value: bool) -> i32 {
    i32::from(value)
}

#[inline]
fn from_flag(value: i32) -> bool {
    value != 0
}

#[inline]
fn to_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[inline]
fn from_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn model_to_record(model: node_info::Model) -> NodeRecord {
    NodeRecord {
        id: model.id,
        domain: model.domain,
        name: model.name,
        description: model.description,
        version: model.version,
        track_count: from_count(model.track_count),
        user_count: from_count(model.user_count),
        open_registration: from_flag(model.open_registration),
        p2p_enabled: from_flag(model.p2p_enabled),
        p2p_node_id: model.p2p_node_id,
        country: model.country,
        token: model.token,
        first_seen: model.first_seen.and_utc(),
        last_seen: model.last_seen.and_utc(),
        last_healthy: model.last_healthy.and_utc(),
        is_online: from_flag(model.is_online),
        down_since: model.down_since.map(|t| t.and_utc()),
    }
}

fn record_to_active_model(record: &NodeRecord) -> node_info::ActiveModel {
    node_info::ActiveModel {
        id: Set(record.id.clone()),
        domain: Set(record.domain.clone()),
        name: Set(record.name.clone()),
        description: Set(record.description.clone()),
        version: Set(record.version.clone()),
        track_count: Set(to_count(record.track_count)),
        user_count: Set(to_count(record.user_count)),
        open_registration: Set(to_flag(record.open_registration)),
        p2p_enabled: Set(to_flag(record.p2p_enabled)),
        p2p_node_id: Set(record.p2p_node_id.clone()),
        country: Set(record.country.clone()),
        token: Set(record.token.clone()),
        first_seen: Set(record.first_seen.naive_utc()),
        last_seen: Set(record.last_seen.naive_utc()),
        last_healthy: Set(record.last_healthy.naive_utc()),
        is_online: Set(to_flag(record.is_online)),
        down_since: Set(record.down_since.map(|t| t.naive_utc())),
    }
}

#[async_trait]
impl NodePersistence for ExternalDbPersistService {
    async fn node_insert(&self, record: &NodeRecord) -> anyhow::Result<()> {
        let result = node_info::Entity::insert(record_to_active_model(record))
            .exec_without_returning(&self.db)
            .await;

        match result {
            Ok(_) => {
                debug!(domain = %record.domain, "Inserted node record");
                Ok(())
            }
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => {
                    Err(PersistenceError::DuplicateKey(detail).into())
                }
                _ => Err(err.into()),
            },
        }
    }

    async fn node_update(&self, record: &NodeRecord) -> anyhow::Result<bool> {
        let result = node_info::Entity::update_many()
            .set(record_to_active_model(record))
            .filter(node_info::Column::Id.eq(record.id.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn node_find_by_id(&self, id: &str) -> anyhow::Result<Option<NodeRecord>> {
        let model = node_info::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;

        Ok(model.map(model_to_record))
    }

    async fn node_find_by_domain(&self, domain: &str) -> anyhow::Result<Option<NodeRecord>> {
        let model = node_info::Entity::find()
            .filter(node_info::Column::Domain.eq(domain))
            .one(&self.db)
            .await?;

        Ok(model.map(model_to_record))
    }

    async fn node_find_by_token(&self, token: &str) -> anyhow::Result<Option<NodeRecord>> {
        let model = node_info::Entity::find()
            .filter(node_info::Column::Token.eq(token))
            .one(&self.db)
            .await?;

        Ok(model.map(model_to_record))
    }

    async fn node_list(&self, include_offline: bool) -> anyhow::Result<Vec<NodeRecord>> {
        let mut query = node_info::Entity::find();
        if !include_offline {
            query = query.filter(node_info::Column::IsOnline.ne(0));
        }

        let models = query
            .order_by_desc(node_info::Column::IsOnline)
            .order_by_desc(node_info::Column::TrackCount)
            .order_by_asc(node_info::Column::Domain)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(model_to_record).collect())
    }

    async fn node_delete(&self, id: &str) -> anyhow::Result<bool> {
        let result = node_info::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn node_delete_if_down_since(
        &self,
        id: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = node_info::Entity::delete_many()
            .filter(node_info::Column::Id.eq(id))
            .filter(node_info::Column::IsOnline.eq(0))
            .filter(node_info::Column::DownSince.lte(cutoff.naive_utc()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn node_delete_by_domain_and_token(
        &self,
        domain: &str,
        token: &str,
    ) -> anyhow::Result<bool> {
        let result = node_info::Entity::delete_many()
            .filter(node_info::Column::Domain.eq(domain))
            .filter(node_info::Column::Token.eq(token))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn node_stats(&self) -> anyhow::Result<NodeStats> {
        // Summed in Rust so the query stays portable across backends
        let rows = node_info::Entity::find()
            .select_only()
            .column(node_info::Column::IsOnline)
            .column(node_info::Column::TrackCount)
            .column(node_info::Column::UserCount)
            .into_tuple::<(i32, i64, i64)>()
            .all(&self.db)
            .await?;

        let mut stats = NodeStats::default();
        for (is_online, track_count, user_count) in rows {
            stats.accumulate(
                from_flag(is_online),
                from_count(track_count),
                from_count(user_count),
            );
        }
        Ok(stats)
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}
