// src/pipeline/dedup.rs

//! Key-set deduplication.
//!
//! Three stages run in order for every source: within the source, against
//! the known dataset keys, and against keys accepted earlier in the run.
//! Each stage reads an immutable `KeySet`; accepting entries produces a
//! new snapshot instead of mutating the old one.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::CandidateEntry;

/// Immutable snapshot of normalized resource keys.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Arc<HashSet<String>>,
}

impl KeySet {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: Arc::new(keys.into_iter().collect()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A new snapshot holding these keys plus `added`.
    pub fn with(&self, added: impl IntoIterator<Item = String>) -> Self {
        let mut keys = (*self.keys).clone();
        keys.extend(added);
        Self {
            keys: Arc::new(keys),
        }
    }

    /// A new snapshot holding the keys of both sets.
    pub fn union(&self, other: &KeySet) -> Self {
        self.with(other.keys.iter().cloned())
    }
}

/// Entries that survived a stage and how many were dropped.
#[derive(Debug, Default)]
pub struct StageResult {
    pub kept: Vec<CandidateEntry>,
    pub duplicates: usize,
}

/// Keep the first occurrence of each key within one source's output.
pub fn within_source(entries: Vec<CandidateEntry>) -> StageResult {
    let mut seen = HashSet::new();
    let mut result = StageResult::default();
    for entry in entries {
        if seen.insert(entry.key()) {
            result.kept.push(entry);
        } else {
            result.duplicates += 1;
        }
    }
    result
}

/// Drop entries whose key is already in `keys`.
pub fn excluding(entries: Vec<CandidateEntry>, keys: &KeySet) -> StageResult {
    let (duplicates, kept): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|e| keys.contains(&e.key()));
    StageResult {
        kept,
        duplicates: duplicates.len(),
    }
}

/// Result of deduplicating one source.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// New entries, in source order
    pub accepted: Vec<CandidateEntry>,
    pub duplicates: usize,
    /// New entries dropped by the per-source cap
    pub capped: usize,
}

/// Runs the three stages for each source and carries the run's seen set.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    known: KeySet,
    seen: KeySet,
}

impl Deduplicator {
    /// `known` holds the keys of the canonical dataset and any alternate
    /// dedup context.
    pub fn new(known: KeySet) -> Self {
        Self {
            known,
            seen: KeySet::default(),
        }
    }

    /// Keys accepted so far in this run.
    pub fn seen(&self) -> &KeySet {
        &self.seen
    }

    /// Deduplicate one source's candidates.
    ///
    /// At most `cap` entries are accepted; the rest are counted as capped
    /// and their keys stay available to later sources.
    pub fn run(&mut self, entries: Vec<CandidateEntry>, cap: Option<usize>) -> DedupOutcome {
        let local = within_source(entries);
        let known = excluding(local.kept, &self.known);
        let fresh = excluding(known.kept, &self.seen);

        let mut accepted = fresh.kept;
        let capped = match cap {
            Some(cap) if accepted.len() > cap => accepted.split_off(cap).len(),
            _ => 0,
        };

        self.seen = self.seen.with(accepted.iter().map(CandidateEntry::key));

        DedupOutcome {
            accepted,
            duplicates: local.duplicates + known.duplicates + fresh.duplicates,
            capped,
        }
    }
}
