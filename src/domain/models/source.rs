// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 目录提供方类型
///
/// 决定一个数据源由哪种适配器爬取
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// 自建 cgit 索引
    #[default]
    Cgit,
    /// GitHub REST API
    #[serde(rename = "github")]
    GitHub,
    /// Gitee OpenAPI v5
    Gitee,
}

impl ProviderKind {
    /// 获取提供方标签
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cgit => "cgit",
            Self::GitHub => "github",
            Self::Gitee => "gitee",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cgit" => Ok(Self::Cgit),
            "github" => Ok(Self::GitHub),
            "gitee" => Ok(Self::Gitee),
            other => Err(SourceError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// 数据源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// 可分页枚举的目录
    Index,
    /// 单个仓库
    Repository,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Repository => "repository",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Self::Index),
            "repository" => Ok(Self::Repository),
            other => Err(SourceError::InvalidSourceType(other.to_string())),
        }
    }
}

/// 数据源描述
///
/// 声明从哪里爬取、需要排除哪些条目，以及这些仓库被推送到的目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// 目录地址（cgit 为完整 URL，GitHub/Gitee 为 `owner` 或 `owner/repo`）
    #[serde(rename = "source")]
    pub url: String,
    /// 排除规则
    #[serde(default)]
    pub excludes: BTreeSet<String>,
    /// 声明的目标标签，保持原有顺序
    #[serde(default)]
    pub targets: Vec<String>,
    /// 提供方，由配置中的分组键决定
    #[serde(default, skip_deserializing)]
    pub provider: ProviderKind,
}

impl Source {
    pub fn new(url: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            url: url.into(),
            excludes: BTreeSet::new(),
            targets: Vec::new(),
            provider,
        }
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// 目标标签以逗号连接后的形式
    pub fn target_url(&self) -> String {
        self.targets.join(",")
    }
}

/// 数据源解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Empty repository source")]
    Empty,
    #[error("Unsupported provider type: {0}")]
    UnsupportedProvider(String),
    #[error("Invalid source type: {0}")]
    InvalidSourceType(String),
    #[error("Malformed repository source: {0}")]
    Malformed(String),
}

/// 解析服务配置中的数据源列表
///
/// 输入是以提供方标签为键、数据源数组为值的 JSON 对象，结果保持声明顺序
pub fn parse_sources(json: &str) -> Result<Vec<Source>, SourceError> {
    if json.trim().is_empty() {
        return Err(SourceError::Empty);
    }

    let groups: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let mut sources = Vec::new();
    for (tag, value) in groups {
        let provider: ProviderKind = tag.parse()?;
        let group: Vec<Source> =
            serde_json::from_value(value).map_err(|e| SourceError::Malformed(e.to_string()))?;
        sources.extend(group.into_iter().map(|mut source| {
            source.provider = provider;
            source
        }));
    }

    if sources.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(sources)
}
