// src/services/github.rs

//! GitHub REST client used for topic search and enrichment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{GitHubConfig, ReleaseInfo, RepoMetadata};
use crate::services::rate_limit::RateLimitInfo;

/// Search results are capped by the API at this page size.
const MAX_PER_PAGE: usize = 100;

/// Relevance filter for a topic search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicQuery {
    pub topic: String,
    pub min_stars: u32,
    pub min_forks: u32,
    pub page_size: usize,
}

impl TopicQuery {
    /// Search qualifier string, e.g. `topic:game stars:>=50 forks:>=5 archived:false`.
    pub fn qualifiers(&self) -> String {
        format!(
            "topic:{} stars:>={} forks:>={} archived:false",
            self.topic.trim(),
            self.min_stars,
            self.min_forks
        )
    }

    pub fn per_page(&self) -> usize {
        self.page_size.clamp(1, MAX_PER_PAGE)
    }
}

/// One repository returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub name: String,
    pub html_url: String,
    pub description: Option<String>,
}

/// The metadata API as seen by the pipeline.
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Repository metadata; `Ok(None)` when the repository does not exist.
    async fn repository(&self, owner: &str, name: &str) -> Result<Option<RepoMetadata>>;

    /// Latest release; `Ok(None)` when the repository has none.
    async fn latest_release(&self, owner: &str, name: &str) -> Result<Option<ReleaseInfo>>;

    /// Current core quota.
    async fn rate_limit(&self) -> Result<RateLimitInfo>;

    /// Repositories matching a topic query, most starred first.
    async fn search_topic(&self, query: &TopicQuery) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    license: Option<LicenseResponse>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    #[serde(default)]
    spdx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    #[serde(default)]
    assets: Vec<AssetResponse>,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    #[serde(default)]
    download_count: u64,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitResource,
}

#[derive(Debug, Deserialize)]
struct RateLimitResource {
    limit: u32,
    remaining: u32,
    reset: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    html_url: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<RepoResponse> for RepoMetadata {
    fn from(repo: RepoResponse) -> Self {
        Self {
            stars: repo.stargazers_count,
            language: repo.language,
            topics: repo.topics,
            // GitHub reports unrecognized licenses as "NOASSERTION".
            license: repo
                .license
                .and_then(|l| l.spdx_id)
                .filter(|id| id != "NOASSERTION"),
            homepage: repo.homepage.filter(|h| !h.trim().is_empty()),
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            archived: repo.archived,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            pushed_at: repo.pushed_at,
            latest_release: None,
            release_downloads: 0,
        }
    }
}

impl From<ReleaseResponse> for ReleaseInfo {
    fn from(release: ReleaseResponse) -> Self {
        Self {
            tag: release.tag_name,
            downloads: release.assets.iter().map(|a| a.download_count).sum(),
        }
    }
}

/// `MetadataApi` implementation over the GitHub REST API.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(client: Client, api_base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Build a client from config, reading the token from the configured
    /// environment variable.
    pub fn from_config(client: Client, config: &GitHubConfig) -> Self {
        let token = std::env::var(&config.token_env).ok();
        if token.is_none() {
            log::warn!(
                "{} is not set; GitHub requests are unauthenticated and heavily rate limited",
                config.token_env
            );
        }
        Self::new(client, config.api_base.clone(), token)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// GET a JSON document; 404 maps to `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<Option<T>> {
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl MetadataApi for GitHubClient {
    async fn repository(&self, owner: &str, name: &str) -> Result<Option<RepoMetadata>> {
        let repo: Option<RepoResponse> = self
            .get_json(self.endpoint(&format!("/repos/{owner}/{name}")))
            .await?;
        Ok(repo.map(RepoMetadata::from))
    }

    async fn latest_release(&self, owner: &str, name: &str) -> Result<Option<ReleaseInfo>> {
        let release: Option<ReleaseResponse> = self
            .get_json(self.endpoint(&format!("/repos/{owner}/{name}/releases/latest")))
            .await?;
        Ok(release.map(ReleaseInfo::from))
    }

    async fn rate_limit(&self) -> Result<RateLimitInfo> {
        let response: RateLimitResponse = self
            .get_json(self.endpoint("/rate_limit"))
            .await?
            .ok_or_else(|| AppError::Api {
                status: 404,
                url: self.endpoint("/rate_limit"),
            })?;
        let core = response.resources.core;
        Ok(RateLimitInfo {
            remaining: core.remaining,
            reset: core.reset,
            limit: core.limit,
        })
    }

    async fn search_topic(&self, query: &TopicQuery) -> Result<Vec<SearchHit>> {
        let mut url = url::Url::parse(&self.endpoint("/search/repositories"))?;
        url.query_pairs_mut()
            .append_pair("q", &query.qualifiers())
            .append_pair("sort", "stars")
            .append_pair("order", "desc")
            .append_pair("per_page", &query.per_page().to_string());

        let response: Option<SearchResponse> = self.get_json(url.to_string()).await?;
        let items = response.map(|r| r.items).unwrap_or_default();

        Ok(items
            .into_iter()
            .take(query.per_page())
            .map(|item| SearchHit {
                name: item.name,
                html_url: item.html_url,
                description: item.description,
            })
            .collect())
    }
}
