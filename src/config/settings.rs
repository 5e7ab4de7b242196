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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含爬取、镜像和存储三部分配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// 爬取配置
    pub crawler: CrawlerSettings,
    /// 镜像配置
    pub mirror: MirrorSettings,
    /// 存储配置
    pub storage: StorageSettings,
}

/// 爬取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 连接超时时间（秒）
    pub connect_timeout: u64,
    /// 读取超时时间（秒）
    pub read_timeout: u64,
    /// 下载失败后的重试次数
    pub retry_times: u32,
    /// 两次重试之间的固定间隔（毫秒）
    pub retry_interval_ms: u64,
    /// 请求使用的 User-Agent
    pub user_agent: String,
    /// GitHub API 地址
    pub github_api: String,
    /// Gitee API 地址
    pub gitee_api: String,
    /// GitHub 凭据文件（内容格式 `user:token`）
    pub github_token_file: Option<PathBuf>,
    /// Gitee 凭据文件（内容格式 `user:token`）
    pub gitee_token_file: Option<PathBuf>,
    /// 是否为缺少分组的仓库填充默认分组
    pub enable_default_section: bool,
    /// 默认分组名称
    pub default_section_name: String,
    /// 并行爬取的数据源数量
    pub source_concurrency: usize,
}

impl CrawlerSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            connect_timeout: 3,
            read_timeout: 10,
            retry_times: 3,
            retry_interval_ms: 3000,
            user_agent: "Mozilla/5.0 (compatible; gitmirror/0.1)".to_string(),
            github_api: "https://api.github.com".to_string(),
            gitee_api: "https://gitee.com/api/v5".to_string(),
            github_token_file: None,
            gitee_token_file: None,
            enable_default_section: true,
            default_section_name: "Unclassified".to_string(),
            source_concurrency: 4,
        }
    }
}

/// 镜像配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorSettings {
    /// 镜像数据根目录，每个服务一个子目录
    pub data_dir: PathBuf,
    /// 备份目录（被回收的镜像与服务数据库）
    pub backup_dir: PathBuf,
    /// cgitrc 片段输出目录
    pub cgitrc_dir: PathBuf,
    /// git 低速阈值（字节/秒）
    pub git_low_speed_limit: u32,
    /// 低于阈值持续多久后中止（秒）
    pub git_low_speed_time: u32,
    /// 单次 git 调用的硬超时（秒），0 表示不限制
    pub git_timeout: u64,
    /// 并行镜像的仓库数量
    pub workers: usize,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/srv/git"),
            backup_dir: PathBuf::from("backup"),
            cgitrc_dir: PathBuf::from("cgitrc"),
            git_low_speed_limit: 1000,
            git_low_speed_time: 60,
            git_timeout: 0,
            workers: 4,
        }
    }
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 服务数据库目录
    pub database_dir: PathBuf,
    /// 运行状态报告目录
    pub status_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_dir: PathBuf::from("database"),
            status_dir: PathBuf::from("log"),
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、配置文件与环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// 从指定配置文件加载配置
    ///
    /// `path` 为空时只读取 `config/default` 与 `config/<APP_ENVIRONMENT>`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let crawler = CrawlerSettings::default();
        let mirror = MirrorSettings::default();
        let storage = StorageSettings::default();

        let mut builder = Config::builder()
            // Crawler defaults
            .set_default("crawler.connect_timeout", crawler.connect_timeout)?
            .set_default("crawler.read_timeout", crawler.read_timeout)?
            .set_default("crawler.retry_times", crawler.retry_times)?
            .set_default("crawler.retry_interval_ms", crawler.retry_interval_ms)?
            .set_default("crawler.user_agent", crawler.user_agent)?
            .set_default("crawler.github_api", crawler.github_api)?
            .set_default("crawler.gitee_api", crawler.gitee_api)?
            .set_default("crawler.enable_default_section", crawler.enable_default_section)?
            .set_default("crawler.default_section_name", crawler.default_section_name)?
            .set_default("crawler.source_concurrency", crawler.source_concurrency as u64)?
            // Mirror defaults
            .set_default("mirror.data_dir", path_default(&mirror.data_dir))?
            .set_default("mirror.backup_dir", path_default(&mirror.backup_dir))?
            .set_default("mirror.cgitrc_dir", path_default(&mirror.cgitrc_dir))?
            .set_default("mirror.git_low_speed_limit", mirror.git_low_speed_limit)?
            .set_default("mirror.git_low_speed_time", mirror.git_low_speed_time)?
            .set_default("mirror.git_timeout", mirror.git_timeout)?
            .set_default("mirror.workers", mirror.workers as u64)?
            // Storage defaults
            .set_default("storage.database_dir", path_default(&storage.database_dir))?
            .set_default("storage.status_dir", path_default(&storage.status_dir))?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder
            .add_source(Environment::with_prefix("GITMIRROR").separator("__"))
            .build()?
            .try_deserialize()
    }
}

fn path_default(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
