//! Quota tracking for the metadata API.
//!
//! The guard is consulted before every enrichment batch. It refreshes the
//! quota from the API, sleeps until the reset time when the remaining
//! budget is below the threshold, and keeps a local estimate to fall back
//! on when the quota endpoint itself fails.

use std::time::Duration;

use chrono::Utc;

use crate::models::GitHubConfig;
use crate::services::github::MetadataApi;

/// Rate limit information for the core resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests remaining in the current window.
    pub remaining: u32,
    /// Unix timestamp when the window resets.
    pub reset: u64,
    /// Total requests allowed per window.
    pub limit: u32,
}

/// Quota guard owned by the enrichment client.
#[derive(Debug, Clone)]
pub struct QuotaGuard {
    threshold: u32,
    reset_margin: Duration,
    max_wait: Duration,
    last: Option<RateLimitInfo>,
    used_since_check: u32,
}

impl QuotaGuard {
    pub fn new(threshold: u32, reset_margin: Duration, max_wait: Duration) -> Self {
        Self {
            threshold,
            reset_margin,
            max_wait,
            last: None,
            used_since_check: 0,
        }
    }

    pub fn from_config(config: &GitHubConfig) -> Self {
        Self::new(
            config.quota_threshold,
            Duration::from_secs(config.reset_margin_secs),
            Duration::from_secs(config.max_wait_secs),
        )
    }

    /// Refresh the quota and sleep until the reset when it runs low.
    ///
    /// Returns `true` if it waited.
    pub async fn check_and_wait(&mut self, api: &dyn MetadataApi) -> bool {
        match api.rate_limit().await {
            Ok(info) => {
                log::debug!(
                    "Quota: {}/{} remaining, resets at {}",
                    info.remaining,
                    info.limit,
                    info.reset
                );
                self.last = Some(info);
                self.used_since_check = 0;
            }
            Err(e) => {
                log::warn!("Quota check failed, using local estimate: {}", e);
            }
        }

        let Some(wait) = self.required_wait(Utc::now().timestamp()) else {
            return false;
        };

        log::info!(
            "Quota low ({} remaining), waiting {}s for reset",
            self.estimated_remaining().unwrap_or(0),
            wait.as_secs()
        );
        tokio::time::sleep(wait).await;

        // The window has rolled over; the next check reloads real numbers.
        if let Some(info) = self.last.as_mut() {
            info.remaining = info.limit;
        }
        self.used_since_check = 0;
        true
    }

    /// Account for requests issued since the last check.
    pub fn record_usage(&mut self, requests: u32) {
        self.used_since_check = self.used_since_check.saturating_add(requests);
    }

    /// Remaining requests according to the last check minus local usage.
    pub fn estimated_remaining(&self) -> Option<u32> {
        self.last
            .as_ref()
            .map(|info| info.remaining.saturating_sub(self.used_since_check))
    }

    /// How long to wait at unix time `now`, if at all.
    pub fn required_wait(&self, now: i64) -> Option<Duration> {
        let info = self.last.as_ref()?;
        let remaining = info.remaining.saturating_sub(self.used_since_check);
        if remaining >= self.threshold {
            return None;
        }

        let now = u64::try_from(now).unwrap_or(0);
        if info.reset <= now {
            return None;
        }

        let wait = Duration::from_secs(info.reset - now) + self.reset_margin;
        if wait > self.max_wait {
            log::warn!(
                "Quota reset is {}s away, capping wait at {}s",
                wait.as_secs(),
                self.max_wait.as_secs()
            );
        }
        Some(wait.min(self.max_wait))
    }
}
