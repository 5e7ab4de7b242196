// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::source::{parse_sources, Source, SourceError};
use serde::{Deserialize, Serialize};

/// 服务配置
///
/// 每个服务数据库中唯一的一行配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub service_name: String,
    /// 对外提供浏览服务的主机名
    #[serde(default)]
    pub host: String,
    /// 是否启用一致性回收
    #[serde(default)]
    pub consistency: bool,
    /// 定时任务表达式
    #[serde(default)]
    pub crontab: String,
    /// 以提供方分组的数据源 JSON 文本
    pub repositories: String,
    /// 创建服务时使用的原始配置文件名（位于备份目录）
    #[serde(default)]
    pub original_schema_ref: String,
}

impl Configuration {
    /// 解析数据源列表
    pub fn sources(&self) -> Result<Vec<Source>, SourceError> {
        parse_sources(&self.repositories)
    }

    /// 供 cgit 使用的仓库浏览地址
    ///
    /// 缺少协议时补全 https，并以服务名作为路径
    pub fn cgit_url(&self) -> Option<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return None;
        }
        let mut url = if host.starts_with("http") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&self.service_name);
        Some(url)
    }
}
