// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::git::client::{GitClient, GitError, GitOptions};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// 基于系统 git 命令的客户端
///
/// 子进程随 future 一起被丢弃时会被终止
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: OsString::from("git"),
        }
    }

    /// 使用指定的 git 可执行文件
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(
        &self,
        name: &str,
        args: Vec<OsString>,
        opts: Option<&GitOptions>,
    ) -> Result<Output, GitError> {
        let mut cmd = Command::new(&self.program);
        if let Some(opts) = opts {
            cmd.arg("-c")
                .arg(format!("http.lowSpeedLimit={}", opts.low_speed_limit))
                .arg("-c")
                .arg(format!("http.lowSpeedTime={}", opts.low_speed_time));
        }
        cmd.args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running git {} {:?}", name, args);
        let output = match opts.and_then(|o| o.timeout) {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| GitError::Timeout {
                    command: name.to_string(),
                    seconds: limit.as_secs(),
                })??,
            None => cmd.output().await?,
        };

        if !output.status.success() {
            return Err(GitError::Failed {
                command: name.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// 上游地址来自目录数据，放在 `--` 之后不会被解释为选项
fn clone_args(url: &str, dest: &Path) -> Vec<OsString> {
    vec![
        OsString::from("clone"),
        OsString::from("--mirror"),
        OsString::from("--"),
        OsString::from(url),
        dest.as_os_str().to_owned(),
    ]
}

#[async_trait]
impl GitClient for GitCli {
    async fn clone_mirror(
        &self,
        url: &str,
        dest: &Path,
        opts: &GitOptions,
    ) -> Result<(), GitError> {
        self.run("clone", clone_args(url, dest), Some(opts))
            .await
            .map(|_| ())
    }

    async fn remote_update_prune(&self, dest: &Path, opts: &GitOptions) -> Result<(), GitError> {
        let args = vec![
            OsString::from("--git-dir"),
            dest.as_os_str().to_owned(),
            OsString::from("remote"),
            OsString::from("update"),
            OsString::from("--prune"),
        ];
        self.run("remote update", args, Some(opts)).await.map(|_| ())
    }

    async fn latest_ref_date(&self, dest: &Path) -> Result<String, GitError> {
        let args = vec![
            OsString::from("--git-dir"),
            dest.as_os_str().to_owned(),
            OsString::from("for-each-ref"),
            OsString::from("--sort=-authordate"),
            OsString::from("--count=1"),
            OsString::from("--format=%(authordate:iso8601)"),
        ];
        let output = self.run("for-each-ref", args, None).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
