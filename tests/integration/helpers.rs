// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use gitmirror::application::use_cases::service_use_case::ServiceManager;
use gitmirror::config::settings::Settings;
use gitmirror::engines::reqwest_engine::ReqwestEngine;
use gitmirror::infrastructure::git::{GitClient, GitError, GitOptions};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 在文件系统上模拟 git 的替身，克隆时写入 `HEAD` 与来源地址
#[derive(Default)]
pub struct FakeGit {
    pub clones: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<PathBuf>>,
}

impl FakeGit {
    pub fn clone_count(&self) -> usize {
        self.clones.lock().unwrap().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl GitClient for FakeGit {
    async fn clone_mirror(&self, url: &str, dest: &Path, _opts: &GitOptions) -> Result<(), GitError> {
        self.clones.lock().unwrap().push(url.to_string());
        std::fs::create_dir_all(dest.join("refs"))?;
        std::fs::write(dest.join("HEAD"), "ref: refs/heads/main\n")?;
        std::fs::write(dest.join("upstream"), url)?;
        Ok(())
    }

    async fn remote_update_prune(&self, dest: &Path, _opts: &GitOptions) -> Result<(), GitError> {
        self.updates.lock().unwrap().push(dest.to_path_buf());
        Ok(())
    }

    async fn latest_ref_date(&self, _dest: &Path) -> Result<String, GitError> {
        Ok("2024-05-01 12:00:00 +0000".to_string())
    }
}

/// 所有目录都位于临时目录下的测试环境
pub struct TestEnv {
    pub tmp: TempDir,
    pub git: Arc<FakeGit>,
    pub manager: ServiceManager,
}

impl TestEnv {
    pub fn path(&self, relative: &str) -> PathBuf {
        self.tmp.path().join(relative)
    }

    /// 写入服务定义并创建服务
    pub async fn add_service(&self, name: &str, repositories: serde_json::Value) {
        self.add_service_with(name, repositories, false).await;
    }

    pub async fn add_service_with(
        &self,
        name: &str,
        repositories: serde_json::Value,
        consistency: bool,
    ) {
        let definition = json!({
            "host": "mirror.example.com",
            "consistency": consistency,
            "repositories": repositories,
        });
        std::fs::write(
            self.path(&format!("database/{}.json", name)),
            definition.to_string(),
        )
        .unwrap();
        self.manager.add(name).await.unwrap();
    }

    pub async fn repositories(&self, name: &str) -> serde_json::Value {
        let json = self.manager.export_repositories(name, None).await.unwrap();
        serde_json::from_str(&json).unwrap()
    }
}

/// 创建测试环境，GitHub 与 Gitee API 指向 `api_base`
pub fn test_env(api_base: &str) -> TestEnv {
    let tmp = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.crawler.github_api = api_base.to_string();
    settings.crawler.gitee_api = format!("{}/api/v5", api_base);
    settings.crawler.retry_times = 0;
    settings.crawler.retry_interval_ms = 1;
    settings.storage.database_dir = tmp.path().join("database");
    settings.storage.status_dir = tmp.path().join("log");
    settings.mirror.data_dir = tmp.path().join("data");
    settings.mirror.backup_dir = tmp.path().join("backup");
    settings.mirror.cgitrc_dir = tmp.path().join("cgitrc");
    std::fs::create_dir_all(&settings.storage.database_dir).unwrap();

    let fetcher = Arc::new(ReqwestEngine::new(&settings.crawler).unwrap());
    let git = Arc::new(FakeGit::default());
    let manager = ServiceManager::with_components(settings, fetcher, git.clone());
    TestEnv { tmp, git, manager }
}

/// GitHub 用户仓库列表中的一项
pub fn github_repo(owner: &str, name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "description": format!("{} by {}", name, owner),
        "html_url": format!("https://github.com/{}/{}", owner, name),
        "clone_url": format!("https://github.com/{}/{}.git", owner, name),
        "owner": {"login": owner},
    })
}

pub fn github_page(owner: &str, names: &[&str]) -> serde_json::Value {
    serde_json::Value::Array(names.iter().map(|n| github_repo(owner, n)).collect())
}
