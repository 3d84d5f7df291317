//! Storage abstractions for the canonical dataset and run reports.
//!
//! ## Layout
//!
//! ```text
//! data/
//! ├── config.toml     # Collector configuration
//! ├── games.json      # Canonical dataset
//! └── report.json     # Optional run report (json or markdown)
//! ```
//!
//! Keys are paths relative to the storage root; absolute keys are used
//! as given.

pub mod local;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Dataset;

pub use local::LocalStorage;

/// Metadata about a completed write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Where the file landed
    pub location: PathBuf,
    /// Records written (0 for reports)
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Storage backend for datasets and reports.
#[async_trait]
pub trait DatasetStorage: Send + Sync {
    /// Load a dataset. `Ok(None)` when it does not exist; unreadable or
    /// malformed files are errors.
    async fn load_dataset(&self, key: &Path) -> Result<Option<Dataset>>;

    /// Write a dataset atomically.
    async fn write_dataset(&self, key: &Path, dataset: &Dataset) -> Result<WriteMetadata>;

    /// Write a rendered report atomically.
    async fn write_report(&self, key: &Path, contents: &str) -> Result<WriteMetadata>;
}
