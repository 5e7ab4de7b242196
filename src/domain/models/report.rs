// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::repository::{Repository, RepositoryDraft};
use crate::domain::models::source::Source;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 报告时间戳格式（本地时间）
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 生成报告时间戳
pub fn report_timestamp() -> String {
    Local::now().format(REPORT_TIMESTAMP_FORMAT).to_string()
}

/// 失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// 重试耗尽后仍无法下载
    Download,
    /// 文档结构不符合预期
    Parse,
    /// 被排除规则跳过
    Exclude,
    /// 本轮已访问过的页面
    AlreadyParsed,
    /// 首页为空的目录
    EmptyIndex,
    /// 远端报告仓库不存在
    NotFound,
    /// 没有可用的克隆地址
    NoCloneUrl,
    /// 与已存记录的描述字段冲突
    IdentityConflict,
    /// 存储层错误
    Store,
}

impl FailureReason {
    /// 面向用户的提示文本
    pub fn describe(&self, url: &str, detail: Option<&str>) -> String {
        let base = match self {
            Self::Download => format!("download failed: {}", url),
            Self::Parse => "parse failed".to_string(),
            Self::Exclude => "exclude".to_string(),
            Self::AlreadyParsed => format!("already parsed {}", url),
            Self::EmptyIndex => "empty index".to_string(),
            Self::NotFound => "repository not found".to_string(),
            Self::NoCloneUrl => "No clone URL".to_string(),
            Self::IdentityConflict => "clone url conflicts with stored repository".to_string(),
            Self::Store => "store error".to_string(),
        };
        match (self, detail) {
            (Self::Exclude | Self::AlreadyParsed | Self::EmptyIndex | Self::NoCloneUrl, _) => base,
            (_, Some(detail)) if !detail.is_empty() => format!("{}: {}", base, detail),
            _ => base,
        }
    }
}

/// 爬取失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlFailure {
    /// 出错的页面或仓库地址
    pub url: String,
    /// 所属数据源
    pub source: String,
    pub reason: FailureReason,
    #[serde(rename = "error")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryDraft>,
    /// 冲突时存储中的现有记录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing: Option<Repository>,
}

impl CrawlFailure {
    pub fn new(reason: FailureReason, url: impl Into<String>, source: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            message: reason.describe(&url, None),
            url,
            source: source.into(),
            reason,
            repository: None,
            existing: None,
        }
    }

    /// 附加错误细节
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.message = self.reason.describe(&self.url, Some(&detail.to_string()));
        self
    }

    pub fn with_repository(mut self, draft: RepositoryDraft) -> Self {
        self.repository = Some(draft);
        self
    }

    pub fn with_existing(mut self, existing: Repository) -> Self {
        self.existing = Some(existing);
        self
    }
}

/// 爬取结果计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub inserted: usize,
    pub merged: usize,
    pub unchanged: usize,
    pub conflicts: usize,
    pub skipped: usize,
    pub aborted: usize,
}

/// 爬取报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub input: Vec<Source>,
    /// 以数据源地址分组的失败列表
    pub status: BTreeMap<String, Vec<CrawlFailure>>,
    #[serde(skip)]
    pub summary: CrawlSummary,
    /// 试运行时收集到的草稿
    #[serde(skip)]
    pub drafts: Vec<RepositoryDraft>,
}

impl CrawlReport {
    pub fn new(input: Vec<Source>) -> Self {
        Self {
            generated_at: report_timestamp(),
            input,
            status: BTreeMap::new(),
            summary: CrawlSummary::default(),
            drafts: Vec::new(),
        }
    }

    pub fn record(&mut self, failure: CrawlFailure) {
        self.status
            .entry(failure.source.clone())
            .or_default()
            .push(failure);
    }

    pub fn failure_count(&self) -> usize {
        self.status.values().map(Vec::len).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// 指定数据源下的失败记录
    pub fn failures_for(&self, source: &str) -> &[CrawlFailure] {
        self.status.get(source).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn file_name(&self, service: &str) -> String {
        format!("{}_parse_{}.json", service, self.generated_at)
    }
}

/// 镜像操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorOperation {
    /// 本地路径解析
    Resolve,
    Clone,
    Update,
    /// 标记文件写入
    Metadata,
    /// 回收搬迁
    Relocate,
    /// 记录时间戳刷新
    Record,
}

impl fmt::Display for MirrorOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Resolve => "resolve",
            Self::Clone => "clone",
            Self::Update => "update",
            Self::Metadata => "metadata",
            Self::Relocate => "relocate",
            Self::Record => "record",
        };
        f.write_str(s)
    }
}

/// 镜像失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorFailure {
    pub name: String,
    pub path: String,
    pub operation: MirrorOperation,
    #[serde(rename = "error")]
    pub message: String,
}

/// 镜像结果计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub cloned: usize,
    pub updated: usize,
    pub relocated: usize,
    pub failed: usize,
}

/// 镜像报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorReport {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub status: Vec<MirrorFailure>,
    #[serde(skip)]
    pub summary: MirrorSummary,
}

impl Default for MirrorReport {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorReport {
    pub fn new() -> Self {
        Self {
            generated_at: report_timestamp(),
            status: Vec::new(),
            summary: MirrorSummary::default(),
        }
    }

    pub fn record(&mut self, failure: MirrorFailure) {
        self.summary.failed += 1;
        self.status.push(failure);
    }

    pub fn has_failures(&self) -> bool {
        !self.status.is_empty()
    }

    pub fn file_name(&self, service: &str) -> String {
        format!("mirror_{}_{}.json", service, self.generated_at)
    }
}
