use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NodeInfo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NodeInfo::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NodeInfo::Domain).string_len(255).not_null())
                    .col(ColumnDef::new(NodeInfo::Name).string().not_null().default(""))
                    .col(
                        ColumnDef::new(NodeInfo::Description)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NodeInfo::Version).string().not_null().default(""))
                    .col(
                        ColumnDef::new(NodeInfo::TrackCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(NodeInfo::UserCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(NodeInfo::OpenRegistration)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(NodeInfo::P2pEnabled)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(NodeInfo::P2pNodeId).string())
                    .col(ColumnDef::new(NodeInfo::Country).string())
                    .col(ColumnDef::new(NodeInfo::Token).string_len(128).not_null())
                    .col(ColumnDef::new(NodeInfo::FirstSeen).date_time().not_null())
                    .col(ColumnDef::new(NodeInfo::LastSeen).date_time().not_null())
                    .col(ColumnDef::new(NodeInfo::LastHealthy).date_time().not_null())
                    .col(
                        ColumnDef::new(NodeInfo::IsOnline)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(NodeInfo::DownSince).date_time())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uk_node_info_domain")
                    .table(NodeInfo::Table)
                    .col(NodeInfo::Domain)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uk_node_info_token")
                    .table(NodeInfo::Table)
                    .col(NodeInfo::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_node_info_is_online")
                    .table(NodeInfo::Table)
                    .col(NodeInfo::IsOnline)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NodeInfo::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum NodeInfo {
    Table,
    Id,
    Domain,
    Name,
    Description,
    Version,
    TrackCount,
    UserCount,
    OpenRegistration,
    P2pEnabled,
    P2pNodeId,
    Country,
    Token,
    FirstSeen,
    LastSeen,
    LastHealthy,
    IsOnline,
    DownSince,
}
