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

use crate::config::settings::CrawlerSettings;
use crate::domain::models::report::{CrawlFailure, CrawlReport, CrawlSummary, FailureReason};
use crate::domain::models::repository::RepositoryDraft;
use crate::domain::models::source::{Source, SourceType};
use crate::domain::providers::provider::{CrawlContext, CrawlEvent};
use crate::domain::services::reconcile_service::{ReconcileOutcome, ReconcileService};
use crate::engines::traits::Fetcher;
use crate::infrastructure::providers::ProviderRegistry;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// 单个数据源的爬取结果，汇总后并入报告
#[derive(Default)]
struct SourceRun {
    failures: Vec<CrawlFailure>,
    drafts: Vec<RepositoryDraft>,
    summary: CrawlSummary,
}

impl SourceRun {
    fn skip(&mut self, failure: CrawlFailure) {
        warn!("Skipped {}: {}", failure.url, failure.message);
        self.summary.skipped += 1;
        self.failures.push(failure);
    }

    fn abort(&mut self, failure: CrawlFailure) {
        warn!("Stopped source {}: {}", failure.source, failure.message);
        self.summary.aborted += 1;
        self.failures.push(failure);
    }
}

fn absorb(report: &mut CrawlReport, run: SourceRun) {
    report.summary.inserted += run.summary.inserted;
    report.summary.merged += run.summary.merged;
    report.summary.unchanged += run.summary.unchanged;
    report.summary.conflicts += run.summary.conflicts;
    report.summary.skipped += run.summary.skipped;
    report.summary.aborted += run.summary.aborted;
    report.drafts.extend(run.drafts);
    for failure in run.failures {
        report.record(failure);
    }
}

/// 爬取服务
///
/// 按数据源枚举仓库、补全字段并交给对账服务，所有失败写入运行报告
pub struct CrawlService {
    /// 下载引擎
    fetcher: Arc<dyn Fetcher>,
    settings: CrawlerSettings,
    registry: ProviderRegistry,
}

impl CrawlService {
    /// 创建新的爬取服务实例
    ///
    /// # 参数
    ///
    /// * `fetcher` - 下载引擎
    /// * `settings` - 爬取配置
    /// * `registry` - 提供方注册表
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        settings: CrawlerSettings,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            fetcher,
            settings,
            registry,
        }
    }

    /// 执行一次完整爬取
    ///
    /// 先处理全部目录数据源，再处理单仓库数据源，保证同一克隆地址上目录数据优先。
    /// 未提供对账服务时为试运行，草稿保存在报告中返回
    ///
    /// # 参数
    ///
    /// * `sources` - 数据源列表
    /// * `reconciler` - 对账服务，`None` 表示试运行
    ///
    /// # 返回值
    ///
    /// 返回运行报告
    pub async fn run(
        &self,
        sources: Vec<Source>,
        reconciler: Option<&ReconcileService>,
    ) -> CrawlReport {
        let mut report = CrawlReport::new(sources.clone());
        // 已访问集合只在本轮内有效
        let ctx = CrawlContext::new(self.fetcher.clone(), self.settings.clone());
        let concurrency = self.settings.source_concurrency.max(1);

        let mut indexes = Vec::new();
        let mut repositories = Vec::new();
        for source in &sources {
            let provider = self.registry.get(source.provider);
            match provider.classify(&ctx, source).await {
                Ok(SourceType::Index) => indexes.push(source),
                Ok(SourceType::Repository) => repositories.push(source),
                Err(failure) => {
                    let mut run = SourceRun::default();
                    run.abort(failure);
                    absorb(&mut report, run);
                }
            }
        }
        info!(
            "Crawling {} index sources and {} repository sources",
            indexes.len(),
            repositories.len()
        );

        let runs: Vec<SourceRun> = stream::iter(indexes)
            .map(|source| self.crawl_index(&ctx, source, reconciler))
            .buffered(concurrency)
            .collect()
            .await;
        for run in runs {
            absorb(&mut report, run);
        }

        let runs: Vec<SourceRun> = stream::iter(repositories)
            .map(|source| self.crawl_repository(&ctx, source, reconciler))
            .buffered(concurrency)
            .collect()
            .await;
        for run in runs {
            absorb(&mut report, run);
        }

        let summary = &report.summary;
        info!(
            "Crawl finished: {} inserted, {} merged, {} unchanged, {} conflicts, {} skipped, {} aborted",
            summary.inserted,
            summary.merged,
            summary.unchanged,
            summary.conflicts,
            summary.skipped,
            summary.aborted
        );
        report
    }

    /// 顺序消费一个目录数据源的全部页面
    async fn crawl_index(
        &self,
        ctx: &CrawlContext,
        source: &Source,
        reconciler: Option<&ReconcileService>,
    ) -> SourceRun {
        let provider = self.registry.get(source.provider);
        let mut run = SourceRun::default();
        info!("Crawling {} index {}", source.provider, source.url);

        let mut events = provider.paginate(ctx, source);
        while let Some(event) = events.next().await {
            match event {
                CrawlEvent::Draft(draft) => {
                    let completed = provider.fetch_one(ctx, source, draft).await;
                    self.settle(source, completed, reconciler, &mut run).await;
                }
                CrawlEvent::Skip(failure) => run.skip(failure),
                CrawlEvent::Abort(failure) => {
                    run.abort(failure);
                    break;
                }
            }
        }
        run
    }

    async fn crawl_repository(
        &self,
        ctx: &CrawlContext,
        source: &Source,
        reconciler: Option<&ReconcileService>,
    ) -> SourceRun {
        let provider = self.registry.get(source.provider);
        let mut run = SourceRun::default();
        info!("Crawling {} repository {}", source.provider, source.url);

        let completed = provider.fetch_one(ctx, source, provider.seed(source)).await;
        self.settle(source, completed, reconciler, &mut run).await;
        run
    }

    /// 处理补全后的事件：草稿进入对账，失败计入报告
    async fn settle(
        &self,
        source: &Source,
        event: CrawlEvent,
        reconciler: Option<&ReconcileService>,
        run: &mut SourceRun,
    ) {
        let draft = match event {
            CrawlEvent::Draft(draft) => draft,
            // 补全阶段的失败只影响单个仓库
            CrawlEvent::Skip(failure) | CrawlEvent::Abort(failure) => {
                run.skip(failure);
                return;
            }
        };

        let Some(reconciler) = reconciler else {
            run.drafts.push(draft);
            return;
        };

        match reconciler.reconcile(&draft).await {
            Ok(ReconcileOutcome::Inserted(_)) => run.summary.inserted += 1,
            Ok(ReconcileOutcome::Merged(_)) => run.summary.merged += 1,
            Ok(ReconcileOutcome::Unchanged(_)) => run.summary.unchanged += 1,
            Ok(ReconcileOutcome::Conflict(existing)) => {
                warn!(
                    "{} conflicts with stored repository {}",
                    draft.clone_url, existing.id
                );
                run.summary.conflicts += 1;
                run.failures.push(
                    CrawlFailure::new(
                        FailureReason::IdentityConflict,
                        draft.primary_clone_url(),
                        &source.url,
                    )
                    .with_repository(draft)
                    .with_existing(existing),
                );
            }
            Err(e) => {
                let failure = CrawlFailure::new(FailureReason::Store, &draft.html_url, &source.url)
                    .with_detail(e)
                    .with_repository(draft);
                run.skip(failure);
            }
        }
    }
}

#[cfg(test)]
#[path = "crawl_service_test.rs"]
mod tests;
