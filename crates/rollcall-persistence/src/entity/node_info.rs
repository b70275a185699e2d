//! `SeaORM` Entity for node_info table
//!
//! Flags are stored as integers (`0`/`1`) and timestamps as naive UTC
//! datetimes. Only the mapper in `sql` converts them.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "node_info")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub domain: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub version: String,
    pub track_count: i64,
    pub user_count: i64,
    pub open_registration: i32,
    pub p2p_enabled: i32,
    pub p2p_node_id: Option<String>,
    pub country: Option<String>,
    #[sea_orm(unique)]
    pub token: String,
    pub first_seen: DateTime,
    pub last_seen: DateTime,
    pub last_healthy: DateTime,
    pub is_online: i32,
    pub down_since: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
