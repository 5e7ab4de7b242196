// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::report::CrawlFailure;
use crate::domain::models::repository::RepositoryDraft;
use crate::domain::models::source::{ProviderKind, Source, SourceType};
use crate::domain::providers::provider::{CrawlContext, CrawlEvent, RepositoryProvider};
use crate::infrastructure::providers::rest_api::{self, RestFlavor};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// GitHub REST API 适配器
#[derive(Debug, Default, Clone)]
pub struct GitHubProvider;

impl GitHubProvider {
    pub fn new() -> Self {
        Self
    }
}

impl RestFlavor for GitHubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    fn api_base<'s>(&self, settings: &'s CrawlerSettings) -> &'s str {
        &settings.github_api
    }
}

#[async_trait]
impl RepositoryProvider for GitHubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn classify(
        &self,
        _ctx: &CrawlContext,
        source: &Source,
    ) -> Result<SourceType, CrawlFailure> {
        rest_api::classify_path(source)
    }

    fn paginate<'a>(
        &'a self,
        ctx: &'a CrawlContext,
        source: &'a Source,
    ) -> BoxStream<'a, CrawlEvent> {
        rest_api::paginate(self, ctx, source)
    }

    async fn fetch_one(
        &self,
        ctx: &CrawlContext,
        source: &Source,
        draft: RepositoryDraft,
    ) -> CrawlEvent {
        rest_api::fetch_one(self, ctx, source, draft).await
    }

    fn matches_exclude(&self, source: &Source, draft: &RepositoryDraft) -> bool {
        rest_api::matches_exclude(source, draft)
    }
}
