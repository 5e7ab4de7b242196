// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::configuration::Configuration;
use crate::domain::models::repository::{Repository, RepositoryDraft};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 克隆地址唯一约束冲突
    #[error("Unique constraint violated for clone url: {0}")]
    UniqueViolation(String),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 存储中的数据无法还原为领域模型
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// 仓库记录存储特质
///
/// 每个服务对应一个存储实例，`clone_url` 上有唯一约束
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// 插入新记录，克隆地址已存在时返回 `UniqueViolation`
    async fn insert(&self, draft: &RepositoryDraft) -> Result<i64, RepositoryError>;
    /// 根据克隆地址查找记录
    async fn find_by_clone_url(&self, clone_url: &str)
        -> Result<Option<Repository>, RepositoryError>;
    /// 覆盖描述字段并刷新 `last_check`
    async fn update(&self, id: i64, draft: &RepositoryDraft) -> Result<(), RepositoryError>;
    /// 刷新 `last_check`
    async fn touch_check(&self, id: i64) -> Result<(), RepositoryError>;
    /// 刷新 `last_update`
    async fn touch_update(&self, id: i64) -> Result<(), RepositoryError>;
    /// 按标识顺序列出全部记录
    async fn list_all(&self) -> Result<Vec<Repository>, RepositoryError>;
    /// 获取服务配置
    async fn get_config(&self) -> Result<Configuration, RepositoryError>;
    /// 保存服务配置（单行，存在即覆盖）
    async fn save_config(&self, config: &Configuration) -> Result<(), RepositoryError>;
}
