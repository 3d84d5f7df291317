//! Per-run report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A non-fatal error collected during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub source_id: String,
    /// URL or path the error relates to
    pub locator: String,
    pub message: String,
}

impl RunError {
    pub fn new(
        source_id: impl Into<String>,
        locator: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            locator: locator.into(),
            message: message.to_string(),
        }
    }
}

/// Counters for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: String,
    /// Candidates extracted
    pub parsed: usize,
    /// Records appended to the dataset
    pub added: usize,
    /// Rejected by any dedup stage
    pub duplicates: usize,
    /// Rejected by validation or the keyword filter
    pub invalid: usize,
    /// Kept without metadata because the lookup found nothing
    pub not_found: usize,
    /// New entries over the per-source cap
    pub capped: usize,
    /// Fetch and enrichment errors
    pub errors: usize,
}

impl SourceReport {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// Add another report's counters into this one.
    pub fn accumulate(&mut self, other: &SourceReport) {
        self.parsed += other.parsed;
        self.added += other.added;
        self.duplicates += other.duplicates;
        self.invalid += other.invalid;
        self.not_found += other.not_found;
        self.capped += other.capped;
        self.errors += other.errors;
    }
}

/// Report for one run across all selected sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Whether metadata lookups were performed
    pub enriched: bool,
    /// Records in the dataset after the run
    pub dataset_count: usize,
    pub sources: Vec<SourceReport>,
    pub errors: Vec<RunError>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, enriched: bool) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            enriched,
            dataset_count: 0,
            sources: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Counter for a source, created on first use.
    pub fn source_mut(&mut self, source_id: &str) -> &mut SourceReport {
        if let Some(index) = self.sources.iter().position(|s| s.source_id == source_id) {
            return &mut self.sources[index];
        }
        self.sources.push(SourceReport::new(source_id));
        let last = self.sources.len() - 1;
        &mut self.sources[last]
    }

    /// Record a non-fatal error against its source.
    pub fn record_error(&mut self, error: RunError) {
        self.source_mut(&error.source_id).errors += 1;
        self.errors.push(error);
    }

    /// Counters summed over all sources.
    pub fn totals(&self) -> SourceReport {
        let mut totals = SourceReport::new("total");
        for source in &self.sources {
            totals.accumulate(source);
        }
        totals
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
