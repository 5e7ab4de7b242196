// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MirrorSettings;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// git 调用错误
#[derive(Error, Debug)]
pub enum GitError {
    /// 无法启动 git 进程
    #[error("Failed to spawn git: {0}")]
    Spawn(#[from] std::io::Error),
    /// git 以非零状态退出
    #[error("git {command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    /// 超过硬超时被终止
    #[error("git {command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },
}

/// 单次 git 调用的传输参数
///
/// 每次调用显式传入，不修改全局 git 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOptions {
    /// `http.lowSpeedLimit`（字节/秒）
    pub low_speed_limit: u32,
    /// `http.lowSpeedTime`（秒）
    pub low_speed_time: u32,
    /// 硬超时，`None` 表示不限制
    pub timeout: Option<Duration>,
}

impl Default for GitOptions {
    fn default() -> Self {
        Self::from(&MirrorSettings::default())
    }
}

impl From<&MirrorSettings> for GitOptions {
    fn from(settings: &MirrorSettings) -> Self {
        Self {
            low_speed_limit: settings.git_low_speed_limit,
            low_speed_time: settings.git_low_speed_time,
            timeout: (settings.git_timeout > 0).then(|| Duration::from_secs(settings.git_timeout)),
        }
    }
}

/// git 客户端特质
#[async_trait]
pub trait GitClient: Send + Sync {
    /// `git clone --mirror <url> <dest>`
    async fn clone_mirror(&self, url: &str, dest: &Path, opts: &GitOptions)
        -> Result<(), GitError>;

    /// `git --git-dir <dest> remote update --prune`
    async fn remote_update_prune(&self, dest: &Path, opts: &GitOptions) -> Result<(), GitError>;

    /// 最新引用的作者时间（ISO 8601），仓库没有引用时为空字符串
    async fn latest_ref_date(&self, dest: &Path) -> Result<String, GitError>;
}
