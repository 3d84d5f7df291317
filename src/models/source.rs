//! Source descriptors and the raw blocks adapters produce.

use serde::{Deserialize, Serialize};

/// How a source is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One markdown document, split into lines
    Document,
    /// Repository search filtered by topic
    TopicSearch,
    /// Paginated HTML directory
    HtmlListing,
    /// Tag listing with one item page per entry
    TagListing,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Document => "document",
            SourceKind::TopicSearch => "topic_search",
            SourceKind::HtmlListing => "html_listing",
            SourceKind::TagListing => "tag_listing",
        }
    }
}

/// A configured source.
///
/// `locator` is a URL or file path for documents, a topic for searches,
/// and the first listing page URL for HTML sources. The remaining fields
/// only matter for the kinds that read them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub kind: SourceKind,
    pub locator: String,

    /// Listing pages to fetch (HTML and tag listings)
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Item pages to fetch (tag listings)
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,

    /// Query parameter carrying the page number
    #[serde(default = "defaults::page_param")]
    pub page_param: String,

    /// Results requested from the search endpoint
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Minimum stars for search results
    #[serde(default = "defaults::min_stars")]
    pub min_stars: u32,

    /// Minimum forks for search results
    #[serde(default = "defaults::min_forks")]
    pub min_forks: u32,

    /// CSS selector for item links on a tag listing page
    #[serde(default)]
    pub item_selector: Option<String>,

    /// CSS selector for the title on an item page
    #[serde(default)]
    pub title_selector: Option<String>,
}

impl SourceDescriptor {
    pub fn new(id: impl Into<String>, kind: SourceKind, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            locator: locator.into(),
            max_pages: defaults::max_pages(),
            max_items: defaults::max_items(),
            page_param: defaults::page_param(),
            page_size: defaults::page_size(),
            min_stars: defaults::min_stars(),
            min_forks: defaults::min_forks(),
            item_selector: None,
            title_selector: None,
        }
    }
}

mod defaults {
    pub fn max_pages() -> usize {
        1
    }
    pub fn max_items() -> usize {
        50
    }
    pub fn page_param() -> String {
        "page".into()
    }
    pub fn page_size() -> usize {
        100
    }
    pub fn min_stars() -> u32 {
        50
    }
    pub fn min_forks() -> u32 {
        5
    }
}

/// Text format of a raw block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    Markdown,
    Html,
}

/// One unit of source text, consumed by the extractor.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub source_id: String,
    pub format: BlockFormat,
    pub text: String,
    /// Page the block was fetched from, for resolving relative links
    pub origin_url: Option<String>,
    /// Title recovered from an item page
    pub title_hint: Option<String>,
}

impl RawBlock {
    pub fn markdown(source_id: &str, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.to_string(),
            format: BlockFormat::Markdown,
            text: text.into(),
            origin_url: None,
            title_hint: None,
        }
    }

    pub fn html(source_id: &str, origin_url: &str, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.to_string(),
            format: BlockFormat::Html,
            text: text.into(),
            origin_url: Some(origin_url.to_string()),
            title_hint: None,
        }
    }

    pub fn with_title_hint(mut self, title: Option<String>) -> Self {
        self.title_hint = title;
        self
    }
}
