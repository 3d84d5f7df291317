//! Candidate and enriched entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host of the external resources every entry points at.
pub const RESOURCE_HOST: &str = "github.com";

/// Normalized `owner/name` key used by every dedup stage.
pub fn resource_key(owner: &str, name: &str) -> String {
    format!(
        "{}/{}",
        owner.trim().to_lowercase(),
        name.trim().to_lowercase()
    )
}

/// Canonical repository URL for an owner/name pair.
pub fn repo_url(owner: &str, name: &str) -> String {
    format!("https://{}/{}/{}", RESOURCE_HOST, owner, name)
}

/// An entry parsed from a source, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub title: String,
    pub owner: String,
    pub name: String,
    pub repo_url: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub homepage: Option<String>,
    pub source_id: String,
}

impl CandidateEntry {
    pub fn new(title: impl Into<String>, owner: &str, name: &str, source_id: &str) -> Self {
        Self {
            title: title.into(),
            owner: owner.to_string(),
            name: name.to_string(),
            repo_url: repo_url(owner, name),
            description: None,
            category: None,
            homepage: None,
            source_id: source_id.to_string(),
        }
    }

    pub fn key(&self) -> String {
        resource_key(&self.owner, &self.name)
    }
}

/// Metadata returned by the repository API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetadata {
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latest_release: Option<String>,
    #[serde(default)]
    pub release_downloads: u64,
}

/// Latest release summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub tag: String,
    pub downloads: u64,
}

/// A candidate after the metadata lookup.
///
/// `metadata` is `None` when the repository was not found or enrichment
/// was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedEntry {
    pub candidate: CandidateEntry,
    pub metadata: Option<RepoMetadata>,
}

impl EnrichedEntry {
    pub fn bare(candidate: CandidateEntry) -> Self {
        Self {
            candidate,
            metadata: None,
        }
    }

    pub fn stars(&self) -> u64 {
        self.metadata.as_ref().map_or(0, |m| m.stars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_key_ignores_case_and_padding() {
        assert_eq!(resource_key(" Acme ", "Foo"), "acme/foo");
        assert_eq!(resource_key("acme", "foo"), resource_key("ACME", "FOO"));
    }

    #[test]
    fn candidate_url_is_rebuilt_from_owner_and_name() {
        let entry = CandidateEntry::new("Foo", "acme", "foo", "list");
        assert_eq!(entry.repo_url, "https://github.com/acme/foo");
        assert_eq!(entry.key(), "acme/foo");
    }
}
