// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::source::ProviderKind;
use crate::domain::providers::provider::RepositoryProvider;
use crate::infrastructure::providers::cgit::CgitProvider;
use crate::infrastructure::providers::gitee::GiteeProvider;
use crate::infrastructure::providers::github::GitHubProvider;

/// 提供方注册表
///
/// 按数据源声明的提供方标签静态分派，不做运行时类型判断
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    cgit: CgitProvider,
    github: GitHubProvider,
    gitee: GiteeProvider,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定类型的适配器
    pub fn get(&self, kind: ProviderKind) -> &dyn RepositoryProvider {
        match kind {
            ProviderKind::Cgit => &self.cgit,
            ProviderKind::GitHub => &self.github,
            ProviderKind::Gitee => &self.gitee,
        }
    }
}
