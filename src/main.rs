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

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use gitmirror::application::use_cases::service_use_case::{AddOutcome, ServiceManager};
use gitmirror::config::settings::Settings;
use gitmirror::domain::models::report::{CrawlReport, MirrorReport};
use gitmirror::utils::telemetry;
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

/// 爬取 cgit、GitHub、Gitee 目录并维护本地 git 镜像
#[derive(Parser, Debug)]
#[command(name = "gitmirror", version, about, long_about = None)]
struct Cli {
    /// 配置文件（默认 config/default.toml）
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    /// 日志过滤规则，例如 `info` 或 `gitmirror=debug`
    #[arg(short = 'L', long, global = true, value_name = "LEVEL", env = "GITMIRROR_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出已创建与可创建的服务
    List,
    /// 从 `<name>.json` 创建或更新服务
    Add { name: String },
    /// 备份并删除服务数据库
    Remove { name: String },
    /// 爬取服务的全部数据源
    Parse {
        name: String,
        /// 只打印结果，不写入存储
        #[arg(long)]
        dry_run: bool,
    },
    /// 镜像服务的全部仓库
    Mirror { name: String },
    /// 依次执行 parse 与 mirror
    Batchrun { name: String },
    /// 导出服务配置或仓库记录
    Get {
        #[arg(value_enum)]
        what: Export,
        name: String,
        /// 输出文件，缺省时打印到标准输出
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Export {
    Configs,
    Repos,
}

fn print_crawl(report: &CrawlReport) {
    let s = &report.summary;
    println!(
        "inserted: {}, merged: {}, unchanged: {}, conflicts: {}, skipped: {}, aborted: {}",
        s.inserted, s.merged, s.unchanged, s.conflicts, s.skipped, s.aborted
    );
}

fn print_mirror(report: &MirrorReport) {
    let s = &report.summary;
    println!(
        "cloned: {}, updated: {}, relocated: {}, failed: {}",
        s.cloned, s.updated, s.relocated, s.failed
    );
}

async fn run(manager: ServiceManager, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            let list = manager.list().await?;
            println!("Service available: {:?}", list.services);
            println!("Possible service available: {:?}", list.candidates);
        }
        Commands::Add { name } => {
            let outcome = manager.add(&name).await?;
            let text = match outcome {
                AddOutcome::Created => "created",
                AddOutcome::Updated => "updated",
                AddOutcome::Unchanged => "unchanged",
            };
            println!("service <{}> {}", name, text);
        }
        Commands::Remove { name } => {
            let backup = manager.remove(&name).await?;
            println!("service <{}> moved to {}", name, backup.display());
        }
        Commands::Parse { name, dry_run } => {
            let report = manager.parse(&name, dry_run).await?;
            if dry_run {
                for draft in &report.drafts {
                    println!("{}", serde_json::to_string(draft)?);
                }
            }
            print_crawl(&report);
        }
        Commands::Mirror { name } => {
            let report = manager.mirror(&name).await?;
            print_mirror(&report);
        }
        Commands::Batchrun { name } => {
            let (crawl, mirror) = manager.batchrun(&name).await?;
            print_crawl(&crawl);
            print_mirror(&mirror);
        }
        Commands::Get { what, name, output } => {
            let json = match what {
                Export::Configs => manager.export_config(&name, output.as_deref()).await?,
                Export::Repos => manager.export_repositories(&name, output.as_deref()).await?,
            };
            if output.is_none() {
                println!("{}", json);
            }
        }
    }
    Ok(())
}

/// 执行命令直到完成或被中断，中断时返回错误使退出码非零
async fn until_interrupted<W, I, T>(work: W, interrupt: I) -> Result<()>
where
    W: Future<Output = Result<()>>,
    I: Future<Output = T>,
{
    tokio::select! {
        result = work => result,
        _ = interrupt => {
            warn!("Interrupted, partial clones are discarded on the next run");
            anyhow::bail!("interrupted")
        }
    }
}

/// 主函数
///
/// 加载配置并执行子命令，收到 Ctrl-C 时放弃当前运行，正在进行的请求与 git 进程随之终止
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.log_level.as_deref());

    let settings = Settings::load(cli.config.as_deref())?;
    info!("Configuration loaded");
    let manager = ServiceManager::new(settings)?;

    until_interrupted(run(manager, cli.command), tokio::signal::ctrl_c()).await
}
