// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::source::{Source, SourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 仓库记录
///
/// 存储中的规范单元。`clone_url` 是身份键：两条 `clone_url` 相同的记录
/// 指向同一个物理仓库，无论名称、分组是否一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// 存储分配的标识，签发后保持不变
    pub id: i64,
    pub name: String,
    /// 分组标签
    pub section: String,
    pub owner: String,
    pub description: String,
    pub html_url: String,
    /// 逗号连接的候选克隆地址，第一个为准
    pub clone_url: String,
    /// 逗号连接的目标标签
    pub target_url: String,
    /// 来源目录地址
    pub source: String,
    pub source_type: SourceType,
    /// 最近一次成功对账的时间
    pub last_check: Option<DateTime<Utc>>,
    /// 最近一次成功镜像同步的时间
    pub last_update: Option<DateTime<Utc>>,
}

impl Repository {
    /// 提取描述性字段
    ///
    /// 忽略 `id`、`last_check`、`last_update`，用于对账时的逐字段比较
    pub fn descriptor(&self) -> RepositoryDraft {
        RepositoryDraft {
            name: self.name.clone(),
            section: self.section.clone(),
            owner: self.owner.clone(),
            description: self.description.clone(),
            html_url: self.html_url.clone(),
            clone_url: self.clone_url.clone(),
            target_url: self.target_url.clone(),
            source: self.source.clone(),
            source_type: self.source_type,
        }
    }

    /// 首选克隆地址
    pub fn primary_clone_url(&self) -> &str {
        primary_clone_url(&self.clone_url)
    }
}

/// 仓库草稿
///
/// 爬取过程中逐步补全、尚未对账的仓库描述。每一步都返回新值，
/// 只有在对账边界才转换为存储记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDraft {
    pub name: String,
    pub section: String,
    pub owner: String,
    pub description: String,
    pub html_url: String,
    pub clone_url: String,
    pub target_url: String,
    pub source: String,
    pub source_type: SourceType,
}

impl RepositoryDraft {
    /// 从数据源创建空草稿，继承来源与目标信息
    pub fn from_source(source: &Source, source_type: SourceType) -> Self {
        Self {
            name: String::new(),
            section: String::new(),
            owner: String::new(),
            description: String::new(),
            html_url: String::new(),
            clone_url: String::new(),
            target_url: source.target_url(),
            source: source.url.clone(),
            source_type,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_html_url(mut self, html_url: impl Into<String>) -> Self {
        self.html_url = html_url.into();
        self
    }

    pub fn with_clone_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.clone_url = urls
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        self
    }

    /// 分组为空时填充默认分组
    pub fn with_default_section(mut self, enabled: bool, default_name: &str) -> Self {
        if self.section.is_empty() && enabled {
            self.section = default_name.to_string();
        }
        self
    }

    /// `owner/name` 组合名
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn primary_clone_url(&self) -> &str {
        primary_clone_url(&self.clone_url)
    }

    /// 附带标识与时间戳，转换为存储记录
    pub fn into_record(
        self,
        id: i64,
        last_check: Option<DateTime<Utc>>,
        last_update: Option<DateTime<Utc>>,
    ) -> Repository {
        Repository {
            id,
            name: self.name,
            section: self.section,
            owner: self.owner,
            description: self.description,
            html_url: self.html_url,
            clone_url: self.clone_url,
            target_url: self.target_url,
            source: self.source,
            source_type: self.source_type,
            last_check,
            last_update,
        }
    }
}

fn primary_clone_url(clone_url: &str) -> &str {
    clone_url.split(',').next().unwrap_or_default().trim()
}
