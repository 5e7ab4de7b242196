// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 服务数据库初始模式迁移
///
/// 创建仓库记录表和服务配置表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Create repositories table
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(ColumnDef::new(Repositories::Section).string().not_null().default(""))
                    .col(ColumnDef::new(Repositories::Owner).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Repositories::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Repositories::HtmlUrl).string().not_null().default(""))
                    .col(ColumnDef::new(Repositories::CloneUrl).string().not_null())
                    .col(ColumnDef::new(Repositories::TargetUrl).string().not_null().default(""))
                    .col(ColumnDef::new(Repositories::Source).string().not_null())
                    .col(ColumnDef::new(Repositories::SourceType).string().not_null())
                    .col(ColumnDef::new(Repositories::LastCheck).timestamp_with_time_zone())
                    .col(ColumnDef::new(Repositories::LastUpdate).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // clone_url is the identity key of a repository
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_clone_url")
                    .table(Repositories::Table)
                    .col(Repositories::CloneUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_source")
                    .table(Repositories::Table)
                    .col(Repositories::Source)
                    .to_owned(),
            )
            .await?;

        // 2. Create configurations table (single row per service)
        manager
            .create_table(
                Table::create()
                    .table(Configurations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Configurations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Configurations::ServiceName).string().not_null())
                    .col(ColumnDef::new(Configurations::Host).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Configurations::Consistency)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Configurations::Crontab).string().not_null().default(""))
                    .col(ColumnDef::new(Configurations::Repositories).text().not_null())
                    .col(
                        ColumnDef::new(Configurations::OriginalSchemaRef)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Configurations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    Name,
    Section,
    Owner,
    Description,
    HtmlUrl,
    CloneUrl,
    TargetUrl,
    Source,
    SourceType,
    LastCheck,
    LastUpdate,
}

#[derive(DeriveIden)]
enum Configurations {
    Table,
    Id,
    ServiceName,
    Host,
    Consistency,
    Crontab,
    Repositories,
    OriginalSchemaRef,
}
