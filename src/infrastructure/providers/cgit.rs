// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::{CrawlFailure, FailureReason};
use crate::domain::models::repository::RepositoryDraft;
use crate::domain::models::source::{ProviderKind, Source, SourceType};
use crate::domain::providers::provider::{exclude_event, CrawlContext, CrawlEvent, RepositoryProvider};
use crate::engines::traits::FetchRequest;
use crate::utils::url_utils::{resolve_url, split_offset};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// 目录页中的一行仓库
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    pub section: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    /// 名称列中最后一个链接
    pub href: Option<String>,
}

/// 解析后的目录页
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPage {
    /// 计入偏移量的行数（不含表头与分组行）
    pub rows: usize,
    pub entries: Vec<IndexEntry>,
}

/// 解析后的仓库页
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPage {
    pub name: String,
    pub description: String,
    pub owner: String,
    /// http(s) 地址在前，git:// 地址在后，各自保持页面顺序
    pub clone_urls: Vec<String>,
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector {}: {}", css, e))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// 根据页签判断页面类型
pub fn parse_tabs(html: &str) -> Result<SourceType, String> {
    let document = Html::parse_document(html);
    let first_tab = selector("table.tabs td")?;
    let tab = document
        .select(&first_tab)
        .next()
        .map(|td| element_text(&td))
        .ok_or_else(|| "missing tabs table".to_string())?;

    if tab == "index" {
        Ok(SourceType::Index)
    } else if tab.contains("summary") {
        Ok(SourceType::Repository)
    } else {
        Err(format!("unexpected tab {:?}", tab))
    }
}

/// 解析目录页
pub fn parse_index_page(html: &str) -> Result<IndexPage, String> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.list.nowrap")?;
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;
    let link_sel = selector("a[href]")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| "missing repository list".to_string())?;

    let mut page = IndexPage::default();
    let (mut name_idx, mut desc_idx, mut owner_idx) = (None, None, None);
    let mut section = String::new();

    for row in table.select(&row_sel) {
        let classes: Vec<&str> = row.value().classes().collect();
        if !classes
            .iter()
            .any(|c| *c == "nohover" || *c == "nohover-highlight")
        {
            page.rows += 1;
        }

        let cols: Vec<ElementRef<'_>> = row.select(&td_sel).collect();
        match cols.len() {
            0 => {
                for (idx, th) in row.select(&th_sel).enumerate() {
                    match element_text(&th).as_str() {
                        "Name" => name_idx = Some(idx),
                        "Description" => desc_idx = Some(idx),
                        "Owner" => owner_idx = Some(idx),
                        _ => {}
                    }
                }
            }
            1 => section = element_text(&cols[0]),
            _ => {
                let cell = |idx: Option<usize>| {
                    idx.and_then(|i| cols.get(i))
                        .map(element_text)
                        .unwrap_or_default()
                };
                let href = name_idx
                    .and_then(|i| cols.get(i))
                    .and_then(|col| col.select(&link_sel).last())
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string);
                page.entries.push(IndexEntry {
                    section: section.clone(),
                    name: cell(name_idx),
                    description: cell(desc_idx),
                    owner: cell(owner_idx),
                    href,
                });
            }
        }
    }

    Ok(page)
}

/// 解析仓库页
pub fn parse_repository_page(html: &str) -> Result<RepositoryPage, String> {
    let document = Html::parse_document(html);
    let header_sel = selector("table#header")?;
    let main_sel = selector("td.main")?;
    let sub_sel = selector("td.sub")?;
    let list_row_sel = selector("table.list tr")?;

    let header = document
        .select(&header_sel)
        .next()
        .ok_or_else(|| "missing header table".to_string())?;

    let name = header
        .select(&main_sel)
        .next()
        .map(|td| element_text(&td))
        .and_then(|text| text.rsplit(':').next().map(|n| n.trim().to_string()))
        .unwrap_or_default();
    let subs: Vec<String> = header.select(&sub_sel).map(|td| element_text(&td)).collect();
    let description = subs.first().cloned().unwrap_or_default();
    let owner = subs.get(1).cloned().unwrap_or_default();

    let rows: Vec<String> = document
        .select(&list_row_sel)
        .map(|row| element_text(&row))
        .collect();
    let mut http = Vec::new();
    let mut git = Vec::new();
    if let Some(pos) = rows.iter().position(|text| text == "Clone") {
        for text in &rows[pos + 1..] {
            if text.starts_with("http://") || text.starts_with("https://") {
                http.push(text.clone());
            } else if text.starts_with("git://") {
                git.push(text.clone());
            }
        }
    }
    http.extend(git);

    Ok(RepositoryPage {
        name,
        description,
        owner,
        clone_urls: http,
    })
}

/// 合并已知字段与仓库页解析结果
///
/// 已知的非空名称、所有者优先；描述取较长者，等长时保留已知值
pub fn merge_repository_page(draft: RepositoryDraft, page: &RepositoryPage) -> RepositoryDraft {
    let name = if draft.name.is_empty() {
        page.name.clone()
    } else {
        draft.name.clone()
    };
    let owner = if draft.owner.is_empty() {
        page.owner.clone()
    } else {
        draft.owner.clone()
    };
    let description = if page.description.len() > draft.description.len() {
        page.description.clone()
    } else {
        draft.description.clone()
    };
    draft
        .with_name(name)
        .with_owner(owner)
        .with_description(description)
        .with_clone_urls(&page.clone_urls)
}

/// 分页游标
struct Cursor {
    base: String,
    offset: u64,
    first: bool,
    done: bool,
}

/// cgit 目录适配器
#[derive(Debug, Default, Clone)]
pub struct CgitProvider;

impl CgitProvider {
    pub fn new() -> Self {
        Self
    }

    /// 抓取并解析一页，返回本页事件与是否继续
    async fn crawl_page(
        &self,
        ctx: &CrawlContext,
        source: &Source,
        cursor: &mut Cursor,
    ) -> Vec<CrawlEvent> {
        let page_url = format!("{}?ofs={}", cursor.base, cursor.offset);
        cursor.done = true;

        if !ctx.mark_visited(&page_url) {
            return vec![CrawlEvent::Skip(CrawlFailure::new(
                FailureReason::AlreadyParsed,
                page_url,
                &source.url,
            ))];
        }
        if source.excludes.contains(&page_url) {
            return vec![CrawlEvent::Skip(CrawlFailure::new(
                FailureReason::Exclude,
                page_url,
                &source.url,
            ))];
        }

        let response = match ctx.download(FetchRequest::html(&page_url), source).await {
            Ok(response) => response,
            Err(failure) => return vec![CrawlEvent::Abort(failure)],
        };

        let page = match parse_index_page(&response.content) {
            Ok(page) => page,
            Err(e) => {
                return vec![CrawlEvent::Abort(
                    CrawlFailure::new(FailureReason::Parse, page_url, &source.url).with_detail(e),
                )]
            }
        };

        if page.rows == 0 {
            if cursor.first {
                return vec![CrawlEvent::Abort(CrawlFailure::new(
                    FailureReason::EmptyIndex,
                    page_url,
                    &source.url,
                ))];
            }
            debug!("Index {} exhausted at offset {}", source.url, cursor.offset);
            return Vec::new();
        }

        debug!(
            "Index page {} yielded {} rows, {} repositories",
            page_url,
            page.rows,
            page.entries.len()
        );
        cursor.offset += page.rows as u64;
        cursor.first = false;
        cursor.done = false;

        let base = Url::parse(&source.url).ok();
        page.entries
            .into_iter()
            .map(|entry| self.entry_event(source, base.as_ref(), entry))
            .collect()
    }

    fn entry_event(&self, source: &Source, base: Option<&Url>, entry: IndexEntry) -> CrawlEvent {
        let url = entry
            .href
            .as_deref()
            .and_then(|href| base.and_then(|b| resolve_url(b, href).ok()))
            .map(|u| u.to_string());

        let draft = RepositoryDraft::from_source(source, SourceType::Index)
            .with_section(entry.section)
            .with_name(entry.name)
            .with_description(entry.description)
            .with_owner(entry.owner);

        let Some(url) = url else {
            return CrawlEvent::Skip(
                CrawlFailure::new(FailureReason::Parse, &source.url, &source.url)
                    .with_detail("repository row without link")
                    .with_repository(draft),
            );
        };

        let draft = draft.with_html_url(url);
        if self.matches_exclude(source, &draft) {
            return exclude_event(source, draft);
        }
        CrawlEvent::Draft(draft)
    }
}

#[async_trait]
impl RepositoryProvider for CgitProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cgit
    }

    async fn classify(
        &self,
        ctx: &CrawlContext,
        source: &Source,
    ) -> Result<SourceType, CrawlFailure> {
        let response = ctx.download(FetchRequest::html(&source.url), source).await?;
        parse_tabs(&response.content).map_err(|e| {
            CrawlFailure::new(FailureReason::Parse, &source.url, &source.url).with_detail(e)
        })
    }

    fn paginate<'a>(
        &'a self,
        ctx: &'a CrawlContext,
        source: &'a Source,
    ) -> BoxStream<'a, CrawlEvent> {
        let (base, offset) = split_offset(&source.url);
        let cursor = Cursor {
            base,
            offset,
            first: true,
            done: false,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            if cursor.done {
                return None;
            }
            let events = self.crawl_page(ctx, source, &mut cursor).await;
            Some((stream::iter(events), cursor))
        })
        .flatten()
        .boxed()
    }

    async fn fetch_one(
        &self,
        ctx: &CrawlContext,
        source: &Source,
        draft: RepositoryDraft,
    ) -> CrawlEvent {
        if self.matches_exclude(source, &draft) {
            return exclude_event(source, draft);
        }

        let url = draft.html_url.clone();
        let response = match ctx.download(FetchRequest::html(&url), source).await {
            Ok(response) => response,
            Err(failure) => return CrawlEvent::Skip(failure.with_repository(draft)),
        };

        let page = match parse_repository_page(&response.content) {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to parse repository page {}: {}", url, e);
                return CrawlEvent::Skip(
                    CrawlFailure::new(FailureReason::Parse, &url, &source.url)
                        .with_detail(e)
                        .with_repository(draft),
                );
            }
        };

        let settings = &ctx.settings;
        let draft = merge_repository_page(draft, &page)
            .with_default_section(settings.enable_default_section, &settings.default_section_name);

        if draft.clone_url.is_empty() {
            return CrawlEvent::Skip(
                CrawlFailure::new(FailureReason::NoCloneUrl, &url, &source.url)
                    .with_repository(draft),
            );
        }
        if self.matches_exclude(source, &draft) {
            return exclude_event(source, draft);
        }
        CrawlEvent::Draft(draft)
    }

    fn matches_exclude(&self, source: &Source, draft: &RepositoryDraft) -> bool {
        source.excludes.contains(&draft.html_url)
    }
}
