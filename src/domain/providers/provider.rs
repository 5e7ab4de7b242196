// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::report::{CrawlFailure, FailureReason};
use crate::domain::models::repository::RepositoryDraft;
use crate::domain::models::source::{ProviderKind, Source, SourceType};
use crate::engines::traits::{DocumentKind, FetchRequest, FetchResponse, Fetcher};
use async_trait::async_trait;
use dashmap::DashSet;
use futures::stream::BoxStream;
use std::sync::Arc;

/// 爬取事件
///
/// 分页与补全的每一步都产生一个事件，调用方据此区分“跳过该条目”与“停止该数据源”
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// 一个仓库草稿
    Draft(RepositoryDraft),
    /// 条目级失败，继续处理
    Skip(CrawlFailure),
    /// 数据源级失败，停止该数据源
    Abort(CrawlFailure),
}

/// 一次爬取运行共享的上下文
pub struct CrawlContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub settings: CrawlerSettings,
    /// 本轮已访问的页面，所有数据源共用
    visited: DashSet<String>,
}

impl CrawlContext {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: CrawlerSettings) -> Self {
        Self {
            fetcher,
            settings,
            visited: DashSet::new(),
        }
    }

    /// 标记页面已访问，首次访问返回 `true`
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// 下载文档，把下载错误映射为失败记录
    ///
    /// 网页的非成功状态同样视为下载失败；JSON 接口的错误体交给提供方解释
    pub async fn download(
        &self,
        request: FetchRequest,
        source: &Source,
    ) -> Result<FetchResponse, CrawlFailure> {
        match self.fetcher.fetch(&request).await {
            Ok(response) if request.kind == DocumentKind::Html && !response.is_success() => {
                Err(
                    CrawlFailure::new(FailureReason::Download, &request.url, &source.url)
                        .with_detail(format!("HTTP {}", response.status_code)),
                )
            }
            Ok(response) => Ok(response),
            Err(e) => Err(CrawlFailure::new(FailureReason::Download, &request.url, &source.url)
                .with_detail(e)),
        }
    }
}

/// 仓库目录提供方特质
///
/// 每种目录格式实现一次，由注册表按数据源声明的提供方分派
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// 提供方类型
    fn kind(&self) -> ProviderKind;

    /// 判断数据源是目录还是单个仓库
    async fn classify(
        &self,
        ctx: &CrawlContext,
        source: &Source,
    ) -> Result<SourceType, CrawlFailure>;

    /// 逐页枚举目录，产生草稿或失败事件
    ///
    /// 序列有限，且在同一数据源内严格按页顺序产生
    fn paginate<'a>(&'a self, ctx: &'a CrawlContext, source: &'a Source)
        -> BoxStream<'a, CrawlEvent>;

    /// 补全单个仓库的剩余字段
    async fn fetch_one(
        &self,
        ctx: &CrawlContext,
        source: &Source,
        draft: RepositoryDraft,
    ) -> CrawlEvent;

    /// 草稿是否命中数据源的排除规则
    fn matches_exclude(&self, source: &Source, draft: &RepositoryDraft) -> bool;

    /// 单仓库数据源的初始草稿
    fn seed(&self, source: &Source) -> RepositoryDraft {
        RepositoryDraft::from_source(source, SourceType::Repository).with_html_url(&source.url)
    }
}

/// 生成排除事件
pub fn exclude_event(source: &Source, draft: RepositoryDraft) -> CrawlEvent {
    let url = draft.html_url.clone();
    CrawlEvent::Skip(
        CrawlFailure::new(FailureReason::Exclude, url, &source.url).with_repository(draft),
    )
}
