// src/pipeline/merge.rs

//! Merge new entries into the canonical dataset.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{CanonicalRecord, Dataset, EnrichedEntry, RunError};

/// URL-safe slug: lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Record id: `owner-name`, lowercased.
pub fn record_id(owner: &str, name: &str) -> String {
    format!("{}-{}", owner.to_lowercase(), name.to_lowercase())
}

/// Builds the next dataset from the existing records plus new entries.
///
/// Existing records are carried over untouched; new ones are appended in
/// acceptance order with a slug unique across the whole dataset.
pub struct MergeAssembler {
    records: Vec<CanonicalRecord>,
    slugs: HashSet<String>,
    ids: HashSet<String>,
    existing: usize,
}

impl MergeAssembler {
    pub fn new(existing: Vec<CanonicalRecord>) -> Self {
        let slugs = existing.iter().map(|r| r.slug.clone()).collect();
        let ids = existing.iter().map(|r| r.id.clone()).collect();
        Self {
            existing: existing.len(),
            records: existing,
            slugs,
            ids,
        }
    }

    /// Append one entry and return the record built for it.
    pub fn push(&mut self, entry: EnrichedEntry, discovered_at: DateTime<Utc>) -> &CanonicalRecord {
        let EnrichedEntry {
            candidate,
            metadata,
        } = entry;

        let id = record_id(&candidate.owner, &candidate.name);
        if !self.ids.insert(id.clone()) {
            log::warn!("Record id '{}' already exists; keeping both records", id);
        }

        let slug = self.unique_slug(&candidate.title, &candidate.owner, &candidate.name);
        let homepage = candidate
            .homepage
            .or_else(|| metadata.as_ref().and_then(|m| m.homepage.clone()));

        self.records.push(CanonicalRecord {
            id,
            slug,
            title: candidate.title,
            owner: candidate.owner,
            name: candidate.name,
            repo_url: candidate.repo_url,
            description: candidate.description,
            category: candidate.category,
            homepage,
            source_id: candidate.source_id,
            discovered_at,
            github: metadata,
        });
        &self.records[self.records.len() - 1]
    }

    /// Records appended so far.
    pub fn added(&self) -> &[CanonicalRecord] {
        &self.records[self.existing..]
    }

    /// Sort by stars descending and wrap the records in a dataset.
    ///
    /// The sort is stable, so ties keep existing records first and new
    /// records in acceptance order.
    pub fn finish(mut self, errors: Vec<RunError>) -> Dataset {
        self.records.sort_by_key(|r| std::cmp::Reverse(r.stars()));
        Dataset::new(self.records, errors)
    }

    fn unique_slug(&mut self, title: &str, owner: &str, name: &str) -> String {
        let mut base = slugify(title);
        if base.is_empty() {
            base = slugify(&format!("{owner}-{name}"));
        }
        if base.is_empty() {
            base = "game".to_string();
        }

        let mut slug = base.clone();
        let mut n = 2;
        while self.slugs.contains(&slug) {
            slug = format!("{base}-{n}");
            n += 1;
        }
        self.slugs.insert(slug.clone());
        slug
    }
}
