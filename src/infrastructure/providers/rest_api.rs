// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! GitHub 与 Gitee 共用的 REST 目录协议

use crate::config::settings::CrawlerSettings;
use crate::domain::models::report::{CrawlFailure, FailureReason};
use crate::domain::models::repository::RepositoryDraft;
use crate::domain::models::source::{ProviderKind, Source, SourceType};
use crate::domain::providers::provider::{exclude_event, CrawlContext, CrawlEvent};
use crate::engines::traits::FetchRequest;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// API 返回的仓库所有者
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOwner {
    pub login: String,
}

/// API 返回的仓库条目，只保留用到的字段
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepository {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    pub owner: ApiOwner,
}

/// 不同 REST 提供方之间的差异点
pub trait RestFlavor: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// API 根地址
    fn api_base<'s>(&self, settings: &'s CrawlerSettings) -> &'s str;

    /// 存储使用的网页地址
    fn html_url(&self, repo: &ApiRepository) -> String {
        repo.html_url.clone()
    }

    /// 克隆地址，缺失时返回 `None`
    fn clone_url(&self, repo: &ApiRepository) -> Option<String> {
        repo.clone_url.clone().filter(|u| !u.trim().is_empty())
    }
}

/// 按路径段数判断数据源类型
pub fn classify_path(source: &Source) -> Result<SourceType, CrawlFailure> {
    let segments: Vec<&str> = source.url.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        [owner] if !owner.is_empty() => Ok(SourceType::Index),
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(SourceType::Repository),
        _ => Err(
            CrawlFailure::new(FailureReason::Parse, &source.url, &source.url)
                .with_detail("expected owner or owner/repo"),
        ),
    }
}

/// 排除规则：含 `/` 的条目比较 `owner/name`，否则比较 `owner`
pub fn matches_exclude(source: &Source, draft: &RepositoryDraft) -> bool {
    let full_name = draft.full_name();
    source.excludes.iter().any(|exclude| {
        if exclude.contains('/') {
            *exclude == full_name
        } else {
            *exclude == draft.owner
        }
    })
}

/// 把 API 条目转换为草稿
pub fn to_draft<F: RestFlavor + ?Sized>(
    flavor: &F,
    source: &Source,
    source_type: SourceType,
    repo: &ApiRepository,
) -> Result<RepositoryDraft, RepositoryDraft> {
    let draft = RepositoryDraft::from_source(source, source_type)
        .with_name(&repo.name)
        .with_section(&repo.owner.login)
        .with_owner(&repo.owner.login)
        .with_description(repo.description.clone().unwrap_or_default())
        .with_html_url(flavor.html_url(repo));

    match flavor.clone_url(repo) {
        Some(clone_url) => Ok(draft.with_clone_urls([clone_url])),
        None => Err(draft),
    }
}

/// API 错误对象中的 `message`
fn api_message(value: &Value) -> Option<String> {
    value
        .as_object()
        .and_then(|obj| obj.get("message"))
        .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
}

fn entry_event<F: RestFlavor + ?Sized>(
    flavor: &F,
    source: &Source,
    source_type: SourceType,
    repo: &ApiRepository,
    page_url: &str,
) -> CrawlEvent {
    match to_draft(flavor, source, source_type, repo) {
        Ok(draft) if matches_exclude(source, &draft) => exclude_event(source, draft),
        Ok(draft) => CrawlEvent::Draft(draft),
        Err(draft) => {
            let url = if draft.html_url.is_empty() {
                page_url.to_string()
            } else {
                draft.html_url.clone()
            };
            CrawlEvent::Skip(
                CrawlFailure::new(FailureReason::NoCloneUrl, url, &source.url)
                    .with_repository(draft),
            )
        }
    }
}

struct PageCursor {
    page: u32,
    done: bool,
}

async fn crawl_page<F: RestFlavor + ?Sized>(
    flavor: &F,
    ctx: &CrawlContext,
    source: &Source,
    cursor: &mut PageCursor,
) -> Vec<CrawlEvent> {
    let owner = source.url.trim_matches('/');
    let api = flavor.api_base(&ctx.settings).trim_end_matches('/');
    let page_url = format!("{}/users/{}/repos?page={}", api, owner, cursor.page);
    cursor.done = true;

    if !ctx.mark_visited(&page_url) {
        return vec![CrawlEvent::Skip(CrawlFailure::new(
            FailureReason::AlreadyParsed,
            page_url,
            &source.url,
        ))];
    }

    let response = match ctx.download(FetchRequest::json(&page_url), source).await {
        Ok(response) => response,
        Err(failure) => return vec![CrawlEvent::Abort(failure)],
    };

    let value: Value = match serde_json::from_str(&response.content) {
        Ok(value) => value,
        Err(e) => {
            return vec![CrawlEvent::Abort(
                CrawlFailure::new(FailureReason::Parse, page_url, &source.url).with_detail(e),
            )]
        }
    };
    if let Some(message) = api_message(&value) {
        return vec![CrawlEvent::Abort(
            CrawlFailure::new(FailureReason::NotFound, page_url, &source.url).with_detail(message),
        )];
    }
    let repos: Vec<ApiRepository> = match serde_json::from_value(value) {
        Ok(repos) => repos,
        Err(e) => {
            return vec![CrawlEvent::Abort(
                CrawlFailure::new(FailureReason::Parse, page_url, &source.url).with_detail(e),
            )]
        }
    };

    if repos.is_empty() {
        if cursor.page == 1 {
            return vec![CrawlEvent::Abort(CrawlFailure::new(
                FailureReason::EmptyIndex,
                page_url,
                &source.url,
            ))];
        }
        debug!("{} index {} exhausted at page {}", flavor.kind(), owner, cursor.page);
        return Vec::new();
    }

    debug!(
        "{} index page {} yielded {} repositories",
        flavor.kind(),
        page_url,
        repos.len()
    );
    cursor.page += 1;
    cursor.done = false;
    repos
        .iter()
        .map(|repo| entry_event(flavor, source, SourceType::Index, repo, &page_url))
        .collect()
}

/// 按页码枚举用户仓库，页码从 1 开始
pub fn paginate<'a, F: RestFlavor + ?Sized>(
    flavor: &'a F,
    ctx: &'a CrawlContext,
    source: &'a Source,
) -> BoxStream<'a, CrawlEvent> {
    let cursor = PageCursor {
        page: 1,
        done: false,
    };
    stream::unfold(cursor, move |mut cursor| async move {
        if cursor.done {
            return None;
        }
        let events = crawl_page(flavor, ctx, source, &mut cursor).await;
        Some((stream::iter(events), cursor))
    })
    .flatten()
    .boxed()
}

/// 补全单个仓库
///
/// 目录条目已带齐字段，只做排除复查；单仓库数据源读取仓库接口
pub async fn fetch_one<F: RestFlavor + ?Sized>(
    flavor: &F,
    ctx: &CrawlContext,
    source: &Source,
    draft: RepositoryDraft,
) -> CrawlEvent {
    if !draft.clone_url.is_empty() {
        if matches_exclude(source, &draft) {
            return exclude_event(source, draft);
        }
        return CrawlEvent::Draft(draft);
    }

    let api = flavor.api_base(&ctx.settings).trim_end_matches('/');
    let url = format!("{}/repos/{}", api, source.url.trim_matches('/'));
    let response = match ctx.download(FetchRequest::json(&url), source).await {
        Ok(response) => response,
        Err(failure) => return CrawlEvent::Skip(failure),
    };

    let value: Value = match serde_json::from_str(&response.content) {
        Ok(value) => value,
        Err(e) => {
            return CrawlEvent::Skip(
                CrawlFailure::new(FailureReason::Parse, url, &source.url).with_detail(e),
            )
        }
    };
    if let Some(message) = api_message(&value) {
        return CrawlEvent::Skip(
            CrawlFailure::new(FailureReason::NotFound, url, &source.url).with_detail(message),
        );
    }
    match serde_json::from_value::<ApiRepository>(value) {
        Ok(repo) => entry_event(flavor, source, draft.source_type, &repo, &url),
        Err(e) => CrawlEvent::Skip(
            CrawlFailure::new(FailureReason::Parse, url, &source.url).with_detail(e),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_path_by_segment_count() {
        let index = Source::new("rust-lang", ProviderKind::GitHub);
        let repo = Source::new("rust-lang/rust", ProviderKind::GitHub);
        let bad = Source::new("a/b/c", ProviderKind::GitHub);

        assert_eq!(classify_path(&index).unwrap(), SourceType::Index);
        assert_eq!(classify_path(&repo).unwrap(), SourceType::Repository);
        assert_eq!(classify_path(&bad).unwrap_err().reason, FailureReason::Parse);
    }

    #[test]
    fn test_matches_exclude_by_owner_or_full_name() {
        let source = Source::new("someone", ProviderKind::GitHub)
            .with_excludes(["ownerX", "someone/private"]);
        let draft = |owner: &str, name: &str| {
            RepositoryDraft::from_source(&source, SourceType::Index)
                .with_owner(owner)
                .with_name(name)
        };

        assert!(matches_exclude(&source, &draft("ownerX", "anything")));
        assert!(matches_exclude(&source, &draft("someone", "private")));
        assert!(!matches_exclude(&source, &draft("someone", "public")));
    }

    #[test]
    fn test_api_message_detects_error_objects() {
        let value: Value = serde_json::from_str(r#"{"message": "Not Found"}"#).unwrap();
        assert_eq!(api_message(&value).as_deref(), Some("Not Found"));

        let list: Value = serde_json::from_str("[]").unwrap();
        assert!(api_message(&list).is_none());
    }
}
