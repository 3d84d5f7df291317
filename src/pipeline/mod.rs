//! Pipeline entry points for collector operations.
//!
//! - `run_collector`: Fetch, extract, dedup, enrich and merge new games
//! - `run_validate`: Check a configuration file
//! - `run_info`: Show the current dataset

pub mod collect;
pub mod dedup;
pub mod load;
pub mod merge;
pub mod report;
pub mod validate;

pub use collect::{RunOptions, RunOutcome, run_collector};
pub use dedup::{Deduplicator, KeySet};
pub use load::{load_dataset, run_info};
pub use merge::{MergeAssembler, slugify};
pub use report::ReportFormat;
pub use validate::run_validate;
