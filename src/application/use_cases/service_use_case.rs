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

use crate::config::settings::Settings;
use crate::domain::models::configuration::Configuration;
use crate::domain::models::report::{report_timestamp, CrawlReport, MirrorReport};
use crate::domain::models::source::{parse_sources, SourceError};
use crate::domain::repositories::repository_store::{RepositoryError, RepositoryStore};
use crate::domain::services::crawl_service::CrawlService;
use crate::domain::services::mirror_service::{MirrorError, MirrorService};
use crate::domain::services::reconcile_service::ReconcileService;
use crate::engines::reqwest_engine::ReqwestEngine;
use crate::engines::traits::{EngineError, Fetcher};
use crate::infrastructure::database::connection::{open_database, sqlite_url};
use crate::infrastructure::git::{GitCli, GitClient, GitOptions};
use crate::infrastructure::providers::ProviderRegistry;
use crate::infrastructure::repositories::repository_store_impl::RepositoryStoreImpl;
use crate::infrastructure::storage::{write_report, MirrorStorage, StorageError};
use sea_orm::DbErr;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service {0} not found")]
    NotFound(String),
    #[error("Service definition {0}.json not found")]
    DefinitionNotFound(String),
    #[error("Invalid service name: {0:?}")]
    InvalidName(String),
    #[error("Invalid service definition: {0}")]
    InvalidDefinition(String),
    #[error("Database directory not found: {0}")]
    MissingDatabaseDir(PathBuf),
    #[error("Repository source error: {0}")]
    Source(#[from] SourceError),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ServiceError + '_ {
    move |source| ServiceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// 服务列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceList {
    /// 已创建的服务（`<name>.db`）
    pub services: Vec<String>,
    /// 可创建的服务定义（`<name>.json`）
    pub candidates: Vec<String>,
}

/// 添加服务的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    /// 服务已存在，配置被新定义替换，仓库记录保留
    Updated,
    /// 新定义与现有配置一致
    Unchanged,
}

/// 服务定义文件 `<name>.json`
#[derive(Debug, Deserialize)]
struct ServiceDefinition {
    #[serde(default)]
    host: String,
    #[serde(default)]
    consistency: bool,
    #[serde(default)]
    crontab: String,
    /// 以提供方分组的数据源，可以是对象或 JSON 文本
    repositories: Value,
}

impl ServiceDefinition {
    fn into_configuration(self, name: &str) -> Result<Configuration, ServiceError> {
        let repositories = match self.repositories {
            Value::String(text) => text,
            value @ Value::Object(_) => value.to_string(),
            other => {
                return Err(ServiceError::InvalidDefinition(format!(
                    "repositories must be an object, got {}",
                    other
                )))
            }
        };
        // 提前校验，避免创建无法爬取的服务
        parse_sources(&repositories)?;
        Ok(Configuration {
            service_name: name.to_string(),
            host: self.host,
            consistency: self.consistency,
            crontab: self.crontab,
            repositories,
            original_schema_ref: String::new(),
        })
    }
}

/// 服务管理用例
///
/// 每个服务对应数据库目录下的一个 SQLite 文件，负责爬取、镜像与导出命令的编排
pub struct ServiceManager {
    settings: Settings,
    fetcher: Arc<dyn Fetcher>,
    git: Arc<dyn GitClient>,
}

impl ServiceManager {
    /// 使用 HTTP 引擎与 git 命令行创建服务管理器
    pub fn new(settings: Settings) -> Result<Self, ServiceError> {
        let fetcher = Arc::new(ReqwestEngine::new(&settings.crawler)?);
        Ok(Self::with_components(settings, fetcher, Arc::new(GitCli::new())))
    }

    /// 使用指定的下载引擎与 git 客户端创建服务管理器
    pub fn with_components(
        settings: Settings,
        fetcher: Arc<dyn Fetcher>,
        git: Arc<dyn GitClient>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            git,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn database_dir(&self) -> &Path {
        &self.settings.storage.database_dir
    }

    fn database_path(&self, name: &str) -> PathBuf {
        self.database_dir().join(format!("{}.db", name))
    }

    fn definition_path(&self, name: &str) -> PathBuf {
        self.database_dir().join(format!("{}.json", name))
    }

    fn database_backup_dir(&self) -> PathBuf {
        self.settings.mirror.backup_dir.join("database")
    }

    /// 服务的镜像数据根目录
    pub fn data_root(&self, name: &str) -> PathBuf {
        self.settings.mirror.data_dir.join(name)
    }

    /// 列出已创建与可创建的服务
    pub async fn list(&self) -> Result<ServiceList, ServiceError> {
        let dir = self.database_dir();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::MissingDatabaseDir(dir.to_path_buf()))
            }
            Err(e) => return Err(io_err(dir)(e)),
        };

        let mut list = ServiceList::default();
        while let Some(entry) = entries.next_entry().await.map_err(io_err(dir))? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            match path.extension().and_then(|e| e.to_str()) {
                Some("db") => list.services.push(stem),
                Some("json") => list.candidates.push(stem),
                _ => {}
            }
        }
        list.services.sort();
        list.candidates.sort();
        Ok(list)
    }

    /// 从 `<name>.json` 创建或更新服务
    ///
    /// 使用过的定义文件移动到备份区，文件名记录在配置的 `original_schema_ref` 中
    pub async fn add(&self, name: &str) -> Result<AddOutcome, ServiceError> {
        validate_name(name)?;
        let definition_path = self.definition_path(name);
        if !definition_path.is_file() {
            return Err(ServiceError::DefinitionNotFound(name.to_string()));
        }
        let text = fs::read_to_string(&definition_path)
            .await
            .map_err(io_err(&definition_path))?;
        let definition: ServiceDefinition = serde_json::from_str(&text)
            .map_err(|e| ServiceError::InvalidDefinition(e.to_string()))?;
        let mut config = definition.into_configuration(name)?;

        let database_path = self.database_path(name);
        let existed = database_path.is_file();
        let store = self.connect(&database_path).await?;

        if existed {
            if let Ok(current) = store.get_config().await {
                let same = Configuration {
                    original_schema_ref: current.original_schema_ref.clone(),
                    ..config.clone()
                } == current;
                if same {
                    fs::remove_file(&definition_path)
                        .await
                        .map_err(io_err(&definition_path))?;
                    info!("Service {} unchanged", name);
                    return Ok(AddOutcome::Unchanged);
                }
            }
        }

        let backup_dir = self.database_backup_dir();
        fs::create_dir_all(&backup_dir)
            .await
            .map_err(io_err(&backup_dir))?;
        let data_root = self.data_root(name);
        fs::create_dir_all(&data_root)
            .await
            .map_err(io_err(&data_root))?;

        config.original_schema_ref = format!("{}_{}.json", name, report_timestamp());
        if let Err(e) = store.save_config(&config).await {
            if !existed {
                drop(store);
                if let Err(cleanup) = fs::remove_file(&database_path).await {
                    warn!("Cannot remove {}: {}", database_path.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        let archived = backup_dir.join(&config.original_schema_ref);
        fs::rename(&definition_path, &archived)
            .await
            .map_err(io_err(&definition_path))?;
        info!(
            "Service {} {}, definition archived to {}",
            name,
            if existed { "updated" } else { "created" },
            archived.display()
        );
        Ok(if existed {
            AddOutcome::Updated
        } else {
            AddOutcome::Created
        })
    }

    /// 把服务数据库移入备份区，镜像数据不受影响
    pub async fn remove(&self, name: &str) -> Result<PathBuf, ServiceError> {
        validate_name(name)?;
        let database_path = self.database_path(name);
        if !database_path.is_file() {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        let backup_dir = self.database_backup_dir();
        fs::create_dir_all(&backup_dir)
            .await
            .map_err(io_err(&backup_dir))?;
        let dest = backup_dir.join(format!("{}_{}.db", name, report_timestamp()));
        fs::rename(&database_path, &dest)
            .await
            .map_err(io_err(&database_path))?;
        info!("Service {} moved to {}", name, dest.display());
        Ok(dest)
    }

    /// 打开已存在的服务
    pub async fn open(&self, name: &str) -> Result<Arc<RepositoryStoreImpl>, ServiceError> {
        validate_name(name)?;
        let database_path = self.database_path(name);
        if !database_path.is_file() {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        self.connect(&database_path).await
    }

    async fn connect(&self, database_path: &Path) -> Result<Arc<RepositoryStoreImpl>, ServiceError> {
        let dir = self.database_dir();
        fs::create_dir_all(dir).await.map_err(io_err(dir))?;
        let db = open_database(&sqlite_url(database_path)).await?;
        Ok(Arc::new(RepositoryStoreImpl::new(Arc::new(db))))
    }

    /// 爬取服务的全部数据源
    ///
    /// 试运行时不写入存储，草稿保存在返回的报告中。存在失败时报告写入状态目录
    pub async fn parse(&self, name: &str, dry_run: bool) -> Result<CrawlReport, ServiceError> {
        let store = self.open(name).await?;
        let config = store.get_config().await?;
        let sources = config.sources()?;
        info!("Parsing service {} ({} sources)", name, sources.len());

        let crawler = CrawlService::new(
            self.fetcher.clone(),
            self.settings.crawler.clone(),
            ProviderRegistry::new(),
        );
        let report = if dry_run {
            crawler.run(sources, None).await
        } else {
            let reconciler = ReconcileService::new(store);
            crawler.run(sources, Some(&reconciler)).await
        };

        if report.has_failures() {
            write_report(
                &self.settings.storage.status_dir,
                &report.file_name(name),
                &report,
            )
            .await?;
        }
        Ok(report)
    }

    /// 镜像服务的全部仓库并生成 `<cgitrc_dir>/<name>.repo`
    pub async fn mirror(&self, name: &str) -> Result<MirrorReport, ServiceError> {
        let store = self.open(name).await?;
        let config = store.get_config().await?;
        let storage = MirrorStorage::new(self.data_root(name), &self.settings.mirror.backup_dir);
        let mirror = MirrorService::new(
            store,
            self.git.clone(),
            storage,
            GitOptions::from(&self.settings.mirror),
            self.settings.mirror.workers,
        );

        let report = mirror.sync(config.consistency).await?;
        if report.has_failures() {
            write_report(
                &self.settings.storage.status_dir,
                &report.file_name(name),
                &report,
            )
            .await?;
        }

        let cgitrc = mirror.generate_cgitrc(config.cgit_url().as_deref()).await?;
        let cgitrc_dir = &self.settings.mirror.cgitrc_dir;
        fs::create_dir_all(cgitrc_dir)
            .await
            .map_err(io_err(cgitrc_dir))?;
        let cgitrc_file = cgitrc_dir.join(format!("{}.repo", name));
        fs::write(&cgitrc_file, cgitrc)
            .await
            .map_err(io_err(&cgitrc_file))?;
        info!("Wrote {}", cgitrc_file.display());
        Ok(report)
    }

    /// 依次执行爬取与镜像
    pub async fn batchrun(&self, name: &str) -> Result<(CrawlReport, MirrorReport), ServiceError> {
        let crawl = self.parse(name, false).await?;
        let mirror = self.mirror(name).await?;
        Ok((crawl, mirror))
    }

    /// 以 JSON 导出仓库记录，指定输出文件时同时写入文件
    pub async fn export_repositories(
        &self,
        name: &str,
        output: Option<&Path>,
    ) -> Result<String, ServiceError> {
        let store = self.open(name).await?;
        let records = store.list_all().await?;
        let json = serde_json::to_string_pretty(&records)?;
        write_output(output, &json).await?;
        Ok(json)
    }

    /// 以 JSON 导出服务配置
    pub async fn export_config(
        &self,
        name: &str,
        output: Option<&Path>,
    ) -> Result<String, ServiceError> {
        let store = self.open(name).await?;
        let config = store.get_config().await?;
        let json = serde_json::to_string_pretty(&config)?;
        write_output(output, &json).await?;
        Ok(json)
    }
}

async fn write_output(output: Option<&Path>, json: &str) -> Result<(), ServiceError> {
    let Some(path) = output else {
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err(parent))?;
    }
    fs::write(path, json).await.map_err(io_err(path))
}

/// 服务名同时用作文件名与路径段
fn validate_name(name: &str) -> Result<(), ServiceError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
#[path = "service_use_case_test.rs"]
mod tests;
