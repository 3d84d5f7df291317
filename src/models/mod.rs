// src/models/mod.rs

//! Domain models for the collector.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod entry;
mod record;
mod report;
mod source;

// Re-export all public types
pub use config::{Config, CrawlerConfig, ExtractionConfig, GitHubConfig, PathsConfig};
pub use entry::{
    CandidateEntry, EnrichedEntry, RESOURCE_HOST, ReleaseInfo, RepoMetadata, repo_url,
    resource_key,
};
pub use record::{CanonicalRecord, Dataset};
pub use report::{RunError, RunReport, SourceReport};
pub use source::{BlockFormat, RawBlock, SourceDescriptor, SourceKind};
