// src/services/enrich.rs

//! Batch enrichment against the metadata API.

use std::time::Duration;

use futures::future;

use crate::models::{CandidateEntry, EnrichedEntry, GitHubConfig, RunError};
use crate::services::github::MetadataApi;
use crate::services::rate_limit::QuotaGuard;

/// Result of enriching a list of candidates.
#[derive(Debug, Default)]
pub struct EnrichmentOutcome {
    /// Surviving entries, in input order
    pub entries: Vec<EnrichedEntry>,
    /// Entries kept without metadata because the repository was not found
    pub not_found: usize,
    /// Lookups that failed; their entries are not in `entries`
    pub errors: Vec<RunError>,
}

enum Lookup {
    Found(EnrichedEntry),
    NotFound(EnrichedEntry),
    Failed(RunError),
}

/// Fetches metadata for candidates in bounded concurrent batches.
pub struct Enricher<'a> {
    api: &'a dyn MetadataApi,
    batch_size: usize,
    batch_delay: Duration,
    guard: QuotaGuard,
}

impl<'a> Enricher<'a> {
    pub fn new(api: &'a dyn MetadataApi, config: &GitHubConfig) -> Self {
        Self {
            api,
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            guard: QuotaGuard::from_config(config),
        }
    }

    /// Enrich every candidate, preserving input order.
    ///
    /// Each batch runs concurrently and completes before the next starts;
    /// the quota is re-checked before every batch.
    pub async fn enrich(&mut self, candidates: Vec<CandidateEntry>) -> EnrichmentOutcome {
        let total = candidates.len();
        let mut outcome = EnrichmentOutcome::default();
        let mut pending = candidates.into_iter().peekable();
        let mut batch_no = 0;

        while pending.peek().is_some() {
            let batch: Vec<CandidateEntry> = pending.by_ref().take(self.batch_size).collect();

            if batch_no > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            batch_no += 1;

            self.guard.check_and_wait(self.api).await;

            let api = self.api;
            let results = future::join_all(batch.into_iter().map(|c| lookup(api, c))).await;

            let requests: u32 = results.iter().map(|(_, n)| *n).sum();
            self.guard.record_usage(requests);

            for (result, _) in results {
                match result {
                    Lookup::Found(entry) => outcome.entries.push(entry),
                    Lookup::NotFound(entry) => {
                        outcome.not_found += 1;
                        outcome.entries.push(entry);
                    }
                    Lookup::Failed(error) => outcome.errors.push(error),
                }
            }

            log::info!(
                "Enriched {}/{} candidates",
                outcome.entries.len() + outcome.errors.len(),
                total
            );
        }

        outcome
    }
}

/// Look up one candidate, returning the result and the requests issued.
async fn lookup(api: &dyn MetadataApi, candidate: CandidateEntry) -> (Lookup, u32) {
    let (owner, name) = (candidate.owner.as_str(), candidate.name.as_str());

    match api.repository(owner, name).await {
        Ok(Some(mut metadata)) => {
            match api.latest_release(owner, name).await {
                Ok(Some(release)) => {
                    metadata.latest_release = Some(release.tag);
                    metadata.release_downloads = release.downloads;
                }
                Ok(None) => {}
                Err(e) => log::debug!("Release lookup failed for {}/{}: {}", owner, name, e),
            }
            let entry = EnrichedEntry {
                candidate,
                metadata: Some(metadata),
            };
            (Lookup::Found(entry), 2)
        }
        Ok(None) => {
            log::debug!("Repository not found: {}/{}", owner, name);
            (Lookup::NotFound(EnrichedEntry::bare(candidate)), 1)
        }
        Err(e) => {
            log::warn!("Lookup failed for {}: {}", candidate.repo_url, e);
            let error = RunError::new(&candidate.source_id, &candidate.repo_url, e);
            (Lookup::Failed(error), 1)
        }
    }
}
