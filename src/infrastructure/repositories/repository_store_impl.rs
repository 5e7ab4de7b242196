// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::configuration::Configuration;
use crate::domain::models::repository::{Repository, RepositoryDraft};
use crate::domain::repositories::repository_store::{RepositoryError, RepositoryStore};
use crate::infrastructure::database::entities::{
    configuration as config_entity, repository as repo_entity,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, Unchanged,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use std::sync::Arc;
use tracing::debug;

/// 仓库记录存储实现
///
/// 基于SeaORM实现，每个服务一个 SQLite 数据库
#[derive(Clone)]
pub struct RepositoryStoreImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl RepositoryStoreImpl {
    /// 创建新的存储实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn touch(&self, id: i64, column: repo_entity::Column) -> Result<(), RepositoryError> {
        let result = repo_entity::Entity::update_many()
            .col_expr(column, Expr::value(now()))
            .filter(repo_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

impl TryFrom<repo_entity::Model> for Repository {
    type Error = RepositoryError;

    fn try_from(model: repo_entity::Model) -> Result<Self, Self::Error> {
        let source_type = model
            .source_type
            .parse()
            .map_err(|e| RepositoryError::InvalidData(format!("repository {}: {}", model.id, e)))?;
        Ok(Self {
            id: model.id,
            name: model.name,
            section: model.section,
            owner: model.owner,
            description: model.description,
            html_url: model.html_url,
            clone_url: model.clone_url,
            target_url: model.target_url,
            source: model.source,
            source_type,
            last_check: model.last_check.map(|t| t.with_timezone(&Utc)),
            last_update: model.last_update.map(|t| t.with_timezone(&Utc)),
        })
    }
}

impl From<config_entity::Model> for Configuration {
    fn from(model: config_entity::Model) -> Self {
        Self {
            service_name: model.service_name,
            host: model.host,
            consistency: model.consistency,
            crontab: model.crontab,
            repositories: model.repositories,
            original_schema_ref: model.original_schema_ref,
        }
    }
}

/// 以草稿的描述字段填充活动模型
fn descriptive_fields(model: &mut repo_entity::ActiveModel, draft: &RepositoryDraft) {
    model.name = Set(draft.name.clone());
    model.section = Set(draft.section.clone());
    model.owner = Set(draft.owner.clone());
    model.description = Set(draft.description.clone());
    model.html_url = Set(draft.html_url.clone());
    model.clone_url = Set(draft.clone_url.clone());
    model.target_url = Set(draft.target_url.clone());
    model.source = Set(draft.source.clone());
    model.source_type = Set(draft.source_type.to_string());
}

fn config_fields(model: &mut config_entity::ActiveModel, config: &Configuration) {
    model.service_name = Set(config.service_name.clone());
    model.host = Set(config.host.clone());
    model.consistency = Set(config.consistency);
    model.crontab = Set(config.crontab.clone());
    model.repositories = Set(config.repositories.clone());
    model.original_schema_ref = Set(config.original_schema_ref.clone());
}

#[async_trait]
impl RepositoryStore for RepositoryStoreImpl {
    async fn insert(&self, draft: &RepositoryDraft) -> Result<i64, RepositoryError> {
        let mut model = repo_entity::ActiveModel {
            id: NotSet,
            last_check: Set(Some(now())),
            last_update: Set(None),
            ..Default::default()
        };
        descriptive_fields(&mut model, draft);

        match repo_entity::Entity::insert(model).exec(self.db.as_ref()).await {
            Ok(result) => {
                debug!("Inserted repository {} as {}", draft.clone_url, result.last_insert_id);
                Ok(result.last_insert_id)
            }
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(RepositoryError::UniqueViolation(draft.clone_url.clone()))
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn find_by_clone_url(
        &self,
        clone_url: &str,
    ) -> Result<Option<Repository>, RepositoryError> {
        repo_entity::Entity::find()
            .filter(repo_entity::Column::CloneUrl.eq(clone_url))
            .one(self.db.as_ref())
            .await?
            .map(Repository::try_from)
            .transpose()
    }

    async fn update(&self, id: i64, draft: &RepositoryDraft) -> Result<(), RepositoryError> {
        let mut model = repo_entity::ActiveModel {
            id: Unchanged(id),
            last_check: Set(Some(now())),
            ..Default::default()
        };
        descriptive_fields(&mut model, draft);

        match model.update(self.db.as_ref()).await {
            Ok(_) => {
                debug!("Updated repository {}", id);
                Ok(())
            }
            Err(DbErr::RecordNotUpdated) | Err(DbErr::RecordNotFound(_)) => {
                Err(RepositoryError::NotFound)
            }
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(RepositoryError::UniqueViolation(draft.clone_url.clone()))
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn touch_check(&self, id: i64) -> Result<(), RepositoryError> {
        self.touch(id, repo_entity::Column::LastCheck).await
    }

    async fn touch_update(&self, id: i64) -> Result<(), RepositoryError> {
        self.touch(id, repo_entity::Column::LastUpdate).await
    }

    async fn list_all(&self) -> Result<Vec<Repository>, RepositoryError> {
        repo_entity::Entity::find()
            .order_by_asc(repo_entity::Column::Id)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Repository::try_from)
            .collect()
    }

    async fn get_config(&self) -> Result<Configuration, RepositoryError> {
        config_entity::Entity::find()
            .order_by_asc(config_entity::Column::Id)
            .one(self.db.as_ref())
            .await?
            .map(Into::into)
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_config(&self, config: &Configuration) -> Result<(), RepositoryError> {
        let existing = config_entity::Entity::find()
            .order_by_asc(config_entity::Column::Id)
            .one(self.db.as_ref())
            .await?;

        match existing {
            Some(row) => {
                let mut model = config_entity::ActiveModel {
                    id: Unchanged(row.id),
                    ..Default::default()
                };
                config_fields(&mut model, config);
                model.update(self.db.as_ref()).await?;
            }
            None => {
                let mut model = config_entity::ActiveModel {
                    id: NotSet,
                    ..Default::default()
                };
                config_fields(&mut model, config);
                config_entity::Entity::insert(model)
                    .exec(self.db.as_ref())
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::source::{ProviderKind, Source, SourceType};
    use crate::infrastructure::database::connection::{open_database, MEMORY_URL};

    async fn store() -> RepositoryStoreImpl {
        let db = open_database(MEMORY_URL).await.unwrap();
        RepositoryStoreImpl::new(Arc::new(db))
    }

    fn draft(clone_url: &str) -> RepositoryDraft {
        let source = Source::new("rust-lang", ProviderKind::GitHub);
        RepositoryDraft::from_source(&source, SourceType::Index)
            .with_name("rust")
            .with_owner("rust-lang")
            .with_clone_urls([clone_url])
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_clone_url() {
        let store = store().await;
        let id = store.insert(&draft("https://github.com/rust-lang/rust.git")).await.unwrap();

        let err = store
            .insert(&draft("https://github.com/rust-lang/rust.git").with_name("renamed"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
        let found = store
            .find_by_clone_url("https://github.com/rust-lang/rust.git")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.name, "rust");
        assert!(found.last_check.is_some());
        assert!(found.last_update.is_none());
    }

    #[tokio::test]
    async fn test_touch_unknown_id_is_not_found() {
        let store = store().await;
        assert!(matches!(
            store.touch_update(42).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_config_is_single_row() {
        let store = store().await;
        assert!(matches!(store.get_config().await, Err(RepositoryError::NotFound)));

        let mut config = Configuration {
            service_name: "yocto".to_string(),
            host: String::new(),
            consistency: false,
            crontab: String::new(),
            repositories: "{}".to_string(),
            original_schema_ref: String::new(),
        };
        store.save_config(&config).await.unwrap();
        config.consistency = true;
        store.save_config(&config).await.unwrap();

        assert_eq!(store.get_config().await.unwrap(), config);
    }
}
