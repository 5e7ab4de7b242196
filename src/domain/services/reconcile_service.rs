// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::repository::{Repository, RepositoryDraft};
use crate::domain::models::source::SourceType;
use crate::domain::repositories::repository_store::{RepositoryError, RepositoryStore};
use std::sync::Arc;
use tracing::debug;

/// 对账结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// 新记录
    Inserted(i64),
    /// 目录数据覆盖了单仓库声明的记录
    Merged(i64),
    /// 描述字段完全一致，只刷新检查时间
    Unchanged(i64),
    /// 同一克隆地址的描述字段不一致，未做任何写入
    Conflict(Repository),
}

/// 对账服务
///
/// 以 `clone_url` 为身份键把草稿合入存储，保证不会出现两条同身份记录
pub struct ReconcileService {
    store: Arc<dyn RepositoryStore>,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn RepositoryStore>) -> Self {
        Self { store }
    }

    /// 对账单个草稿
    ///
    /// 除唯一约束冲突外的存储错误直接返回，不在此层重试
    pub async fn reconcile(
        &self,
        draft: &RepositoryDraft,
    ) -> Result<ReconcileOutcome, RepositoryError> {
        match self.store.insert(draft).await {
            Ok(id) => return Ok(ReconcileOutcome::Inserted(id)),
            Err(RepositoryError::UniqueViolation(_)) => {}
            Err(e) => return Err(e),
        }

        let existing = self
            .store
            .find_by_clone_url(&draft.clone_url)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if existing.source_type == SourceType::Repository && draft.source_type == SourceType::Index
        {
            debug!(
                "Index draft subsumes repository record {} ({})",
                existing.id, draft.clone_url
            );
            self.store.update(existing.id, draft).await?;
            return Ok(ReconcileOutcome::Merged(existing.id));
        }

        if existing.descriptor() == *draft {
            self.store.touch_check(existing.id).await?;
            return Ok(ReconcileOutcome::Unchanged(existing.id));
        }

        debug!(
            "Draft for {} conflicts with stored record {}",
            draft.clone_url, existing.id
        );
        Ok(ReconcileOutcome::Conflict(existing))
    }
}

#[cfg(test)]
#[path = "reconcile_service_test.rs"]
mod tests;
