// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// git 进程调用模块
///
/// 镜像同步通过 `GitClient` 调用 git，默认实现为命令行子进程
pub mod client;
pub mod git_cli;

pub use client::{GitClient, GitError, GitOptions};
pub use git_cli::GitCli;
