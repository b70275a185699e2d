//! Rollcall schema migrations
//!
//! Apply with [`Migrator::up`] before handing a connection to the SQL
//! persistence backend.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_node_info;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_create_node_info::Migration)]
    }
}
