//! In-memory fetcher and metadata API for tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{ReleaseInfo, RepoMetadata, resource_key};
use crate::services::github::{MetadataApi, SearchHit, TopicQuery};
use crate::services::rate_limit::RateLimitInfo;
use crate::utils::http::PageFetcher;

/// Serves fixed bodies by URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::fetch(url, "HTTP 404 Not Found"))
    }
}

/// Metadata API backed by maps keyed on `owner/name`.
///
/// Unknown repositories are reported as not found. Quotas are served in
/// order, then an unlimited quota is returned.
#[derive(Default)]
pub struct MockApi {
    repos: HashMap<String, RepoMetadata>,
    releases: HashMap<String, ReleaseInfo>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    hits: Vec<SearchHit>,
    quotas: Mutex<VecDeque<RateLimitInfo>>,
    rate_limit_calls: Mutex<usize>,
    repository_calls: Mutex<Vec<(String, Instant)>>,
}

impl MockApi {
    pub fn with_repo(mut self, owner: &str, name: &str, stars: u64) -> Self {
        let metadata = RepoMetadata {
            stars,
            ..RepoMetadata::default()
        };
        self.repos.insert(resource_key(owner, name), metadata);
        self
    }

    pub fn with_release(mut self, owner: &str, name: &str, release: ReleaseInfo) -> Self {
        self.releases.insert(resource_key(owner, name), release);
        self
    }

    pub fn with_failure(mut self, owner: &str, name: &str) -> Self {
        self.failing.insert(resource_key(owner, name));
        self
    }

    pub fn with_delay(mut self, owner: &str, name: &str, delay: Duration) -> Self {
        self.delays.insert(resource_key(owner, name), delay);
        self
    }

    pub fn with_hit(mut self, owner: &str, name: &str, description: Option<&str>) -> Self {
        self.hits.push(SearchHit {
            name: name.to_string(),
            html_url: format!("https://github.com/{owner}/{name}"),
            description: description.map(String::from),
        });
        self
    }

    pub fn with_quota(self, quota: RateLimitInfo) -> Self {
        self.quotas.lock().unwrap().push_back(quota);
        self
    }

    pub fn rate_limit_calls(&self) -> usize {
        *self.rate_limit_calls.lock().unwrap()
    }

    pub fn repository_calls(&self) -> Vec<(String, Instant)> {
        self.repository_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataApi for MockApi {
    async fn repository(&self, owner: &str, name: &str) -> Result<Option<RepoMetadata>> {
        let key = resource_key(owner, name);
        self.repository_calls
            .lock()
            .unwrap()
            .push((key.clone(), Instant::now()));

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&key) {
            return Err(AppError::Api {
                status: 502,
                url: format!("https://api.github.com/repos/{key}"),
            });
        }
        Ok(self.repos.get(&key).cloned())
    }

    async fn latest_release(&self, owner: &str, name: &str) -> Result<Option<ReleaseInfo>> {
        Ok(self.releases.get(&resource_key(owner, name)).cloned())
    }

    async fn rate_limit(&self) -> Result<RateLimitInfo> {
        *self.rate_limit_calls.lock().unwrap() += 1;
        let next = self.quotas.lock().unwrap().pop_front();
        Ok(next.unwrap_or(RateLimitInfo {
            remaining: 5000,
            reset: 0,
            limit: 5000,
        }))
    }

    async fn search_topic(&self, query: &TopicQuery) -> Result<Vec<SearchHit>> {
        Ok(self.hits.iter().take(query.per_page()).cloned().collect())
    }
}
