//! Service layer for the collector.
//!
//! - Source adapters (`SourceFetcher`)
//! - Entry extraction (`EntryExtractor`)
//! - Keyword filtering (`CandidateFilter`)
//! - Metadata lookups and quota handling (`GitHubClient`, `Enricher`)

pub mod enrich;
pub mod extractor;
pub mod filter;
pub mod github;
pub mod rate_limit;
pub mod sources;

pub use enrich::{Enricher, EnrichmentOutcome};
pub use extractor::{EntryExtractor, ExtractOutcome};
pub use filter::{CandidateFilter, Rejection};
pub use github::{GitHubClient, MetadataApi, SearchHit, TopicQuery};
pub use rate_limit::{QuotaGuard, RateLimitInfo};
pub use sources::{SourceBlocks, SourceFetcher};
