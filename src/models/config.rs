//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{SourceDescriptor, SourceKind};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Metadata API and enrichment settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Extraction and filtering rules
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Default file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Sources, processed in this order
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceDescriptor>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, or return defaults if the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("Config file {:?} not found. Using defaults.", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.github.batch_size == 0 {
            return Err(AppError::validation("github.batch_size must be > 0"));
        }
        if url::Url::parse(&self.github.api_base).is_err() {
            return Err(AppError::validation(format!(
                "github.api_base is not a valid URL: {}",
                self.github.api_base
            )));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }

        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(AppError::validation("source id is empty"));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
            if source.locator.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "source '{}' has an empty locator",
                    source.id
                )));
            }
            if source.kind == SourceKind::TagListing && source.item_selector.is_none() {
                return Err(AppError::validation(format!(
                    "tag listing '{}' needs an item_selector",
                    source.id
                )));
            }
        }
        Ok(())
    }

    /// Look up a configured source by id.
    pub fn source(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.id == id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            github: GitHubConfig::default(),
            extraction: ExtractionConfig::default(),
            paths: PathsConfig::default(),
            sources: defaults::sources(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between sequential page fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Metadata API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Environment variable holding the API token
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// Lookups issued concurrently per batch
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Pause between batches in milliseconds
    #[serde(default = "defaults::batch_delay")]
    pub batch_delay_ms: u64,

    /// Wait for the quota reset when fewer requests than this remain
    #[serde(default = "defaults::quota_threshold")]
    pub quota_threshold: u32,

    /// Seconds added to the reset time before resuming
    #[serde(default = "defaults::reset_margin")]
    pub reset_margin_secs: u64,

    /// Upper bound for a single quota wait
    #[serde(default = "defaults::max_wait")]
    pub max_wait_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            token_env: defaults::token_env(),
            batch_size: defaults::batch_size(),
            batch_delay_ms: defaults::batch_delay(),
            quota_threshold: defaults::quota_threshold(),
            reset_margin_secs: defaults::reset_margin(),
            max_wait_secs: defaults::max_wait(),
        }
    }
}

/// Extraction and filtering rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Headings that clear the current category
    #[serde(default = "defaults::excluded_headings")]
    pub excluded_headings: Vec<String>,

    /// Path segments that never name a repository owner
    #[serde(default = "defaults::denied_segments")]
    pub denied_segments: Vec<String>,

    /// Keywords marking non-game entries
    #[serde(default = "defaults::denied_keywords")]
    pub denied_keywords: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            excluded_headings: defaults::excluded_headings(),
            denied_segments: defaults::denied_segments(),
            denied_keywords: defaults::denied_keywords(),
        }
    }
}

/// Default file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Canonical dataset file
    #[serde(default = "defaults::dataset_file")]
    pub dataset_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset_file: defaults::dataset_file(),
        }
    }
}

mod defaults {
    use crate::models::{SourceDescriptor, SourceKind};

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; collector/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        250
    }

    // GitHub defaults
    pub fn api_base() -> String {
        "https://api.github.com".into()
    }
    pub fn token_env() -> String {
        "GITHUB_TOKEN".into()
    }
    pub fn batch_size() -> usize {
        10
    }
    pub fn batch_delay() -> u64 {
        1000
    }
    pub fn quota_threshold() -> u32 {
        10
    }
    pub fn reset_margin() -> u64 {
        5
    }
    pub fn max_wait() -> u64 {
        3600
    }

    // Extraction defaults
    pub fn excluded_headings() -> Vec<String> {
        [
            "contributing",
            "license",
            "table of contents",
            "see also",
            "references",
            "footnotes",
            "changelog",
            "acknowledgments",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn denied_segments() -> Vec<String> {
        [
            "about",
            "apps",
            "collections",
            "contact",
            "customer-stories",
            "enterprise",
            "events",
            "explore",
            "features",
            "join",
            "login",
            "marketplace",
            "new",
            "notifications",
            "orgs",
            "organizations",
            "pricing",
            "pulls",
            "search",
            "security",
            "settings",
            "site",
            "sponsors",
            "topics",
            "trending",
            "users",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn denied_keywords() -> Vec<String> {
        [
            "engine",
            "framework",
            "library",
            "sdk",
            "toolkit",
            "template",
            "tutorial",
            "demo",
            "asset pack",
            "collection",
            "directory",
            "wrapper",
            "plugin",
            "mod",
            "awesome list",
            "boilerplate",
            "starter kit",
            "bindings",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    // Path defaults
    pub fn dataset_file() -> String {
        "data/games.json".into()
    }

    // Source defaults
    pub fn sources() -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new(
                "bobeff-open-source-games",
                SourceKind::Document,
                "https://raw.githubusercontent.com/bobeff/open-source-games/master/README.md",
            ),
            SourceDescriptor::new(
                "leereilly-games",
                SourceKind::Document,
                "https://raw.githubusercontent.com/leereilly/games/master/README.md",
            ),
            SourceDescriptor::new("github-topic-game", SourceKind::TopicSearch, "game"),
            SourceDescriptor::new(
                "osgameclones",
                SourceKind::HtmlListing,
                "https://osgameclones.com/",
            ),
            SourceDescriptor {
                item_selector: Some("a.title.game_link".into()),
                title_selector: Some("h1.game_title".into()),
                ..SourceDescriptor::new(
                    "itch-open-source",
                    SourceKind::TagListing,
                    "https://itch.io/games/tag-open-source",
                )
            },
        ]
    }
}
