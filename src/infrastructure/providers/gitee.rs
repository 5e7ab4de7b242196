// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::report::CrawlFailure;
use crate::domain::models::repository::RepositoryDraft;
use crate::domain::models::source::{ProviderKind, Source, SourceType};
use crate::domain::providers::provider::{CrawlContext, CrawlEvent, RepositoryProvider};
use crate::infrastructure::providers::rest_api::{self, ApiRepository, RestFlavor};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Gitee OpenAPI v5 适配器
///
/// Gitee 的 `html_url` 带 `.git` 后缀，且部分接口不返回 `clone_url`
#[derive(Debug, Default, Clone)]
pub struct GiteeProvider;

impl GiteeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl RestFlavor for GiteeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gitee
    }

    fn api_base<'s>(&self, settings: &'s CrawlerSettings) -> &'s str {
        &settings.gitee_api
    }

    fn html_url(&self, repo: &ApiRepository) -> String {
        repo.html_url
            .strip_suffix(".git")
            .unwrap_or(&repo.html_url)
            .to_string()
    }

    fn clone_url(&self, repo: &ApiRepository) -> Option<String> {
        if let Some(url) = repo.clone_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.to_string());
        }
        let html_url = self.html_url(repo);
        if html_url.is_empty() {
            None
        } else {
            Some(format!("{}.git", html_url))
        }
    }
}

#[async_trait]
impl RepositoryProvider for GiteeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gitee
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::providers::rest_api::ApiOwner;

    fn repo(html_url: &str, clone_url: Option<&str>) -> ApiRepository {
        ApiRepository {
            name: "hello".to_string(),
            description: None,
            html_url: html_url.to_string(),
            clone_url: clone_url.map(str::to_string),
            owner: ApiOwner {
                login: "someone".to_string(),
            },
        }
    }

    #[test]
    fn test_html_url_is_stored_without_git_suffix() {
        let provider = GiteeProvider::new();
        let r = repo("https://gitee.com/someone/hello.git", None);

        assert_eq!(provider.html_url(&r), "https://gitee.com/someone/hello");
        assert_eq!(
            provider.clone_url(&r).as_deref(),
            Some("https://gitee.com/someone/hello.git")
        );
    }

    #[test]
    fn test_explicit_clone_url_wins() {
        let provider = GiteeProvider::new();
        let r = repo(
            "https://gitee.com/someone/hello",
            Some("https://gitee.com/someone/hello-mirror.git"),
        );

        assert_eq!(
            provider.clone_url(&r).as_deref(),
            Some("https://gitee.com/someone/hello-mirror.git")
        );
    }
}
