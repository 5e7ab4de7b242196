// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::{MirrorFailure, MirrorOperation, MirrorReport};
use crate::domain::models::repository::Repository;
use crate::domain::repositories::repository_store::{RepositoryError, RepositoryStore};
use crate::infrastructure::git::{GitClient, GitOptions};
use crate::infrastructure::storage::{
    ensure_export_marker, write_description, write_last_modified, MirrorStorage, StorageError,
};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// 导致整轮镜像中止的结构性错误
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Data directory does not exist: {0}")]
    MissingDataDir(PathBuf),
    #[error("Storage error: {0}")]
    Storage(StorageError),
    #[error("Failed to read repository records: {0}")]
    Records(#[from] RepositoryError),
}

impl From<StorageError> for MirrorError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::MissingDataDir(path) => MirrorError::MissingDataDir(path),
            other => MirrorError::Storage(other),
        }
    }
}

/// 单个仓库完成的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncAction {
    Cloned,
    Updated,
}

fn failure(
    record: &Repository,
    path: &Path,
    operation: MirrorOperation,
    e: impl fmt::Display,
) -> MirrorFailure {
    MirrorFailure {
        name: record.name.clone(),
        path: path.display().to_string(),
        operation,
        message: format!("{} failed: {}", operation, e),
    }
}

/// 克隆过程中使用的临时目录
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// 镜像服务
///
/// 把存储中的仓库记录同步为本地裸仓库，并维护 cgit 所需的标记文件
pub struct MirrorService {
    store: Arc<dyn RepositoryStore>,
    git: Arc<dyn GitClient>,
    storage: MirrorStorage,
    options: GitOptions,
    /// 并行镜像数量
    workers: usize,
    /// 同一路径同时只允许一个 git 进程
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl MirrorService {
    pub fn new(
        store: Arc<dyn RepositoryStore>,
        git: Arc<dyn GitClient>,
        storage: MirrorStorage,
        options: GitOptions,
        workers: usize,
    ) -> Self {
        Self {
            store,
            git,
            storage,
            options,
            workers: workers.max(1),
            locks: DashMap::new(),
        }
    }

    /// 同步全部仓库
    ///
    /// 单个仓库失败只记入报告；数据目录缺失或记录无法读取时整轮中止。
    /// 开启一致性检查时，没有对应记录的本地镜像会被移入备份区，不会被删除
    ///
    /// # 参数
    ///
    /// * `consistency` - 是否回收没有记录的本地镜像
    ///
    /// # 返回值
    ///
    /// 返回镜像报告
    pub async fn sync(&self, consistency: bool) -> Result<MirrorReport, MirrorError> {
        if let Err(e) = self.storage.check_data_dir() {
            error!("Mirror aborted: {}", e);
            return Err(e.into());
        }
        let records = self.store.list_all().await.map_err(|e| {
            error!("Mirror aborted, cannot read records: {}", e);
            e
        })?;
        info!(
            "Mirroring {} repositories with {} workers",
            records.len(),
            self.workers
        );

        let outcomes: Vec<Result<SyncAction, MirrorFailure>> = stream::iter(records.iter())
            .map(|record| self.sync_one(record))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut report = MirrorReport::new();
        for outcome in outcomes {
            match outcome {
                Ok(SyncAction::Cloned) => report.summary.cloned += 1,
                Ok(SyncAction::Updated) => report.summary.updated += 1,
                Err(f) => {
                    warn!("{}: {}", f.name, f.message);
                    report.record(f);
                }
            }
        }

        if consistency {
            self.collect_garbage(&mut report).await?;
        }

        info!(
            "Mirror finished: {} cloned, {} updated, {} relocated, {} failed",
            report.summary.cloned,
            report.summary.updated,
            report.summary.relocated,
            report.summary.failed
        );
        Ok(report)
    }

    async fn sync_one(&self, record: &Repository) -> Result<SyncAction, MirrorFailure> {
        let path = self
            .storage
            .repository_path(&record.source, &record.name)
            .map_err(|e| failure(record, Path::new(""), MirrorOperation::Resolve, e))?;

        let lock = self.locks.entry(path.clone()).or_default().clone();
        let _guard = lock.lock().await;

        let action = if path.is_dir() {
            info!("Update: {}", record.name);
            self.git
                .remote_update_prune(&path, &self.options)
                .await
                .map_err(|e| failure(record, &path, MirrorOperation::Update, e))?;
            SyncAction::Updated
        } else {
            info!("Mirror: {}", record.name);
            self.clone_into_place(record, &path)
                .await
                .map_err(|e| failure(record, &path, MirrorOperation::Clone, e))?;
            SyncAction::Cloned
        };

        self.write_markers(record, &path)
            .await
            .map_err(|e| failure(record, &path, MirrorOperation::Metadata, e))?;

        self.store
            .touch_update(record.id)
            .await
            .map_err(|e| failure(record, &path, MirrorOperation::Record, e))?;
        Ok(action)
    }

    /// 先克隆到临时目录，成功后再改名到最终位置
    async fn clone_into_place(&self, record: &Repository, path: &Path) -> Result<(), String> {
        let url = record.primary_clone_url();
        if url.is_empty() {
            return Err("No clone URL".to_string());
        }

        let partial = partial_path(path);
        if partial.exists() {
            fs::remove_dir_all(&partial)
                .await
                .map_err(|e| format!("cannot remove {}: {}", partial.display(), e))?;
        }
        if let Some(parent) = partial.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
        }

        if let Err(e) = self.git.clone_mirror(url, &partial, &self.options).await {
            if partial.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&partial).await {
                    warn!("Cannot remove {}: {}", partial.display(), cleanup);
                }
            }
            return Err(e.to_string());
        }

        fs::rename(&partial, path)
            .await
            .map_err(|e| format!("cannot move clone into {}: {}", path.display(), e))
    }

    async fn write_markers(&self, record: &Repository, path: &Path) -> Result<(), String> {
        let date = self
            .git
            .latest_ref_date(path)
            .await
            .map_err(|e| e.to_string())?;
        write_last_modified(path, &date)
            .await
            .map_err(|e| e.to_string())?;
        write_description(path, &record.description)
            .await
            .map_err(|e| e.to_string())?;
        ensure_export_marker(path)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// 重新读取记录，把没有记录对应的本地镜像移入备份区
    async fn collect_garbage(&self, report: &mut MirrorReport) -> Result<(), MirrorError> {
        let records = self.store.list_all().await?;
        let expected: HashSet<PathBuf> = records
            .iter()
            .filter_map(|r| self.storage.repository_path(&r.source, &r.name).ok())
            .collect();

        for mirror in self.storage.list_local_mirrors()? {
            if expected.contains(&mirror) {
                continue;
            }
            match self.storage.relocate(&mirror).await {
                Ok(_) => report.summary.relocated += 1,
                Err(e) => {
                    let name = mirror
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    warn!("Cannot relocate {}: {}", mirror.display(), e);
                    report.record(MirrorFailure {
                        name,
                        path: mirror.display().to_string(),
                        operation: MirrorOperation::Relocate,
                        message: format!("relocate failed: {}", e),
                    });
                }
            }
        }
        Ok(())
    }

    /// 为本地已有的镜像生成 cgitrc 片段
    pub async fn generate_cgitrc(&self, cgit_url: Option<&str>) -> Result<String, MirrorError> {
        let records = self.store.list_all().await?;
        let local = self.storage.list_local_mirrors()?;
        Ok(render_cgitrc(&records, &local, &self.storage, cgit_url))
    }
}

/// 渲染 cgitrc 片段
///
/// 只包含本地存在的镜像；同名仓库第二次出现时以 `owner.name` 作为 URL
pub fn render_cgitrc(
    records: &[Repository],
    local: &[PathBuf],
    storage: &MirrorStorage,
    cgit_url: Option<&str>,
) -> String {
    let local: HashSet<&PathBuf> = local.iter().collect();
    let cgit_url = cgit_url.filter(|u| !u.is_empty()).map(|u| {
        if u.ends_with('/') {
            u.to_string()
        } else {
            format!("{}/", u)
        }
    });

    let mut seen = HashSet::new();
    let mut out = String::new();
    for record in records {
        let Ok(path) = storage.repository_path(&record.source, &record.name) else {
            continue;
        };
        if !local.contains(&path) {
            continue;
        }

        let slug = if seen.insert(record.name.as_str()) {
            record.name.clone()
        } else {
            format!("{}.{}", record.owner, record.name)
        };
        let upstream = record.primary_clone_url();
        let clone_url = match &cgit_url {
            Some(base) => format!("{}{} {}", base, slug, upstream),
            None => upstream.to_string(),
        };

        out.push_str(&format!("repo.url={}\n", slug));
        out.push_str(&format!("repo.name={}\n", record.name));
        out.push_str(&format!("repo.desc={}\n", record.description));
        out.push_str(&format!("repo.owner={}\n", record.owner));
        out.push_str(&format!("repo.section={}\n", record.section));
        out.push_str(&format!("repo.path={}\n", path.display()));
        out.push_str(&format!("repo.clone-url={}\n", clone_url));
        out.push_str(&format!("repo.homepage={}\n", record.html_url));
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "mirror_service_test.rs"]
mod tests;
