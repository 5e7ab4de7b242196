// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub section: String,
    pub owner: String,
    pub description: String,
    pub html_url: String,
    #[sea_orm(unique)]
    pub clone_url: String,
    pub target_url: String,
    pub source: String,
    pub source_type: String,
    pub last_check: Option<DateTimeWithTimeZone>,
    pub last_update: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
