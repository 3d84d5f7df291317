// src/services/sources.rs

//! Source adapters.
//!
//! Every adapter turns one configured source into raw blocks for the
//! extractor. A failed fetch becomes a `RunError` and that unit yields
//! nothing; there are no retries.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{RawBlock, RunError, SourceDescriptor, SourceKind};
use crate::services::github::{MetadataApi, SearchHit, TopicQuery};
use crate::utils::http::PageFetcher;
use crate::utils::{is_remote, page_url, resolve};

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").unwrap());

/// Blocks and errors produced by one source.
#[derive(Debug, Default)]
pub struct SourceBlocks {
    pub blocks: Vec<RawBlock>,
    pub errors: Vec<RunError>,
}

impl SourceBlocks {
    fn fail(&mut self, source: &SourceDescriptor, locator: &str, error: impl std::fmt::Display) {
        log::warn!("[{}] {}: {}", source.id, locator, error);
        self.errors.push(RunError::new(&source.id, locator, error));
    }
}

/// Fetches configured sources through the page and metadata seams.
pub struct SourceFetcher<'a> {
    pages: &'a dyn PageFetcher,
    api: &'a dyn MetadataApi,
    delay: Duration,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(pages: &'a dyn PageFetcher, api: &'a dyn MetadataApi, delay: Duration) -> Self {
        Self { pages, api, delay }
    }

    /// Fetch one source into raw blocks.
    pub async fn fetch(&self, source: &SourceDescriptor) -> SourceBlocks {
        log::info!("[{}] Fetching {} source {}", source.id, source.kind.as_str(), source.locator);
        let fetched = match source.kind {
            SourceKind::Document => self.fetch_document(source).await,
            SourceKind::TopicSearch => self.search_topic(source).await,
            SourceKind::HtmlListing => self.fetch_listing(source).await,
            SourceKind::TagListing => self.fetch_tag_listing(source).await,
        };
        log::info!(
            "[{}] {} blocks, {} errors",
            source.id,
            fetched.blocks.len(),
            fetched.errors.len()
        );
        fetched
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// A markdown document from a URL or a local path, one block per line.
    async fn fetch_document(&self, source: &SourceDescriptor) -> SourceBlocks {
        let mut out = SourceBlocks::default();
        let text = if is_remote(&source.locator) {
            self.pages.fetch_text(&source.locator).await
        } else {
            tokio::fs::read_to_string(&source.locator)
                .await
                .map_err(AppError::from)
        };

        match text {
            Ok(text) => out.blocks = document_blocks(&source.id, &text),
            Err(e) => out.fail(source, &source.locator, e),
        }
        out
    }

    /// Topic search results rendered as markdown list lines.
    async fn search_topic(&self, source: &SourceDescriptor) -> SourceBlocks {
        let mut out = SourceBlocks::default();
        let query = TopicQuery {
            topic: source.locator.clone(),
            min_stars: source.min_stars,
            min_forks: source.min_forks,
            page_size: source.page_size,
        };

        match self.api.search_topic(&query).await {
            Ok(hits) => {
                out.blocks = hits
                    .iter()
                    .map(|hit| RawBlock::markdown(&source.id, hit_line(hit)))
                    .collect();
            }
            Err(e) => out.fail(source, &query.qualifiers(), e),
        }
        out
    }

    /// Listing pages as HTML blocks. Pagination stops at the first failed page.
    async fn fetch_listing(&self, source: &SourceDescriptor) -> SourceBlocks {
        let mut out = SourceBlocks::default();

        for page in 1..=source.max_pages.max(1) {
            if page > 1 {
                self.pause().await;
            }
            let Some(url) = page_url(&source.locator, &source.page_param, page) else {
                out.fail(source, &source.locator, "invalid listing URL");
                break;
            };
            match self.pages.fetch_text(&url).await {
                Ok(body) => out.blocks.push(RawBlock::html(&source.id, &url, body)),
                Err(e) => {
                    out.fail(source, &url, e);
                    break;
                }
            }
        }
        out
    }

    /// Item links from the listing pages, then one HTML block per item page.
    async fn fetch_tag_listing(&self, source: &SourceDescriptor) -> SourceBlocks {
        let mut out = SourceBlocks::default();

        let item_selector = match source.item_selector.as_deref() {
            Some(s) => parse_selector(s),
            None => Err(AppError::config(format!(
                "source '{}' has no item_selector",
                source.id
            ))),
        };
        let title_selector = source
            .title_selector
            .as_deref()
            .map(parse_selector)
            .transpose();
        let (item_selector, title_selector) = match (item_selector, title_selector) {
            (Ok(item), Ok(title)) => (item, title),
            (Err(e), _) | (_, Err(e)) => {
                out.fail(source, &source.locator, e);
                return out;
            }
        };

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        for page in 1..=source.max_pages.max(1) {
            if items.len() >= source.max_items {
                break;
            }
            if page > 1 {
                self.pause().await;
            }
            let Some(url) = page_url(&source.locator, &source.page_param, page) else {
                out.fail(source, &source.locator, "invalid listing URL");
                break;
            };
            let body = match self.pages.fetch_text(&url).await {
                Ok(body) => body,
                Err(e) => {
                    out.fail(source, &url, e);
                    break;
                }
            };
            for link in item_links(&body, &url, &item_selector) {
                if items.len() >= source.max_items {
                    break;
                }
                if seen.insert(link.clone()) {
                    items.push(link);
                }
            }
        }
        log::debug!("[{}] {} item pages to fetch", source.id, items.len());

        for item in &items {
            self.pause().await;
            match self.pages.fetch_text(item).await {
                Ok(body) => {
                    let title = item_title(&body, title_selector.as_ref());
                    out.blocks
                        .push(RawBlock::html(&source.id, item, body).with_title_hint(title));
                }
                Err(e) => out.fail(source, item, e),
            }
        }
        out
    }
}

/// One markdown block per line of a document.
pub fn document_blocks(source_id: &str, text: &str) -> Vec<RawBlock> {
    text.lines()
        .map(|line| RawBlock::markdown(source_id, line))
        .collect()
}

/// Render a search hit in the list-entry shape the line extractor reads.
fn hit_line(hit: &SearchHit) -> String {
    let description = hit
        .description
        .as_deref()
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|d| !d.is_empty());

    match description {
        Some(d) => format!("- **[{}]({})** - {}", hit.name, hit.html_url, d),
        None => format!("- **[{}]({})**", hit.name, hit.html_url),
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Absolute item URLs on a listing page, in document order.
fn item_links(body: &str, page_url: &str, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(body);
    document
        .select(selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve(page_url, href.trim()))
        .collect()
}

/// Title of an item page: the configured selector, else `<title>`.
fn item_title(body: &str, selector: Option<&Selector>) -> Option<String> {
    let document = Html::parse_document(body);
    let text_of = |sel: &Selector| {
        document
            .select(sel)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
    };
    selector.and_then(text_of).or_else(|| text_of(&TITLE_SELECTOR))
}
