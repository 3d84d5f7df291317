//! Canonical records and the persisted dataset.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{RepoMetadata, RunError, resource_key};

/// A game in the canonical dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// `owner-name`, lowercased
    pub id: String,
    /// URL-safe, unique across the dataset
    pub slug: String,
    pub title: String,
    pub owner: String,
    pub name: String,
    pub repo_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub source_id: String,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub github: Option<RepoMetadata>,
}

impl CanonicalRecord {
    pub fn key(&self) -> String {
        resource_key(&self.owner, &self.name)
    }

    pub fn stars(&self) -> u64 {
        self.github.as_ref().map_or(0, |m| m.stars)
    }
}

/// The canonical dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Timestamp of the last write
    pub updated_at: DateTime<Utc>,
    /// Number of records
    pub count: usize,
    /// Non-fatal errors from the run that wrote this file
    #[serde(default)]
    pub errors: Vec<RunError>,
    /// The records
    pub games: Vec<CanonicalRecord>,
}

impl Dataset {
    pub fn new(games: Vec<CanonicalRecord>, errors: Vec<RunError>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: games.len(),
            errors,
            games,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Normalized resource keys of every record.
    pub fn keys(&self) -> HashSet<String> {
        self.games.iter().map(CanonicalRecord::key).collect()
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::empty()
    }
}
