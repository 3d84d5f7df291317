// src/pipeline/collect.rs

//! Collection pipeline.
//!
//! Sources are processed one after another in configured order. Each one
//! flows through fetch, extraction, filtering, dedup and enrichment, and
//! its survivors are appended by the merge assembler. The dataset is read
//! once at the start and written once at the end.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{
    CandidateEntry, CanonicalRecord, Config, Dataset, EnrichedEntry, RawBlock, RunReport,
    SourceDescriptor, SourceReport,
};
use crate::pipeline::dedup::{Deduplicator, KeySet};
use crate::pipeline::load::load_dataset;
use crate::pipeline::merge::MergeAssembler;
use crate::pipeline::report::{self, ReportFormat};
use crate::services::{
    CandidateFilter, Enricher, EntryExtractor, ExtractOutcome, MetadataApi, SourceFetcher,
};
use crate::storage::{DatasetStorage, WriteMetadata};
use crate::utils::http::PageFetcher;
use crate::utils::log;

/// Per-run options, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Source ids to run; empty runs every configured source
    pub sources: Vec<String>,
    /// Cap on new entries accepted from a single source
    pub max_new_per_source: Option<usize>,
    pub skip_enrichment: bool,
    /// Canonical dataset path; defaults to `paths.dataset_file`
    pub output: Option<PathBuf>,
    /// Extra dataset whose keys count as already known
    pub dedup_dataset: Option<PathBuf>,
    /// Fail instead of starting empty when a dataset cannot be read
    pub require_dataset: bool,
    pub report: Option<PathBuf>,
    pub report_format: ReportFormat,
}

impl RunOptions {
    /// Path of the canonical dataset for this run.
    pub fn dataset_path<'a>(&'a self, config: &'a Config) -> &'a Path {
        self.output
            .as_deref()
            .unwrap_or_else(|| Path::new(&config.paths.dataset_file))
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub dataset: Dataset,
    pub report: RunReport,
    /// Records appended by this run, in acceptance order
    pub added: Vec<CanonicalRecord>,
}

/// Run the collector over the selected sources.
pub async fn run_collector(
    config: &Config,
    options: &RunOptions,
    storage: &dyn DatasetStorage,
    pages: &dyn PageFetcher,
    api: &dyn MetadataApi,
) -> Result<RunOutcome> {
    let started_at = Utc::now();
    let sources = select_sources(config, &options.sources)?;
    let dataset_path = options.dataset_path(config);

    log::header(&format!("Collecting from {} sources", sources.len()));

    let existing = load_dataset(storage, dataset_path, options.require_dataset).await?;
    log::info(&format!(
        "Loaded {} existing records from {}",
        existing.games.len(),
        dataset_path.display()
    ));

    let mut known = KeySet::new(existing.keys());
    if let Some(path) = &options.dedup_dataset {
        let alternate = load_dataset(storage, path, options.require_dataset).await?;
        log::info(&format!(
            "Using {} keys from {} as dedup context",
            alternate.games.len(),
            path.display()
        ));
        known = known.union(&KeySet::new(alternate.keys()));
    }

    let extractor = EntryExtractor::new(&config.extraction);
    let filter = CandidateFilter::new(&config.extraction);
    let fetcher = SourceFetcher::new(
        pages,
        api,
        Duration::from_millis(config.crawler.request_delay_ms),
    );
    let mut enricher = Enricher::new(api, &config.github);
    let mut dedup = Deduplicator::new(known);
    let mut merge = MergeAssembler::new(existing.games);
    let mut report = RunReport::new(started_at, !options.skip_enrichment);

    for (index, source) in sources.iter().enumerate() {
        log::step(
            index + 1,
            sources.len(),
            &format!("{} ({})", source.id, source.kind.as_str()),
        );

        let fetched = fetcher.fetch(source).await;
        report.source_mut(&source.id);
        for error in fetched.errors {
            report.record_error(error);
        }

        let candidates = extract_candidates(
            &extractor,
            &filter,
            &fetched.blocks,
            report.source_mut(&source.id),
        );

        let deduped = dedup.run(candidates, options.max_new_per_source);
        {
            let counters = report.source_mut(&source.id);
            counters.duplicates += deduped.duplicates;
            counters.capped += deduped.capped;
        }

        let entries = if options.skip_enrichment {
            deduped
                .accepted
                .into_iter()
                .map(EnrichedEntry::bare)
                .collect()
        } else {
            let outcome = enricher.enrich(deduped.accepted).await;
            report.source_mut(&source.id).not_found += outcome.not_found;
            for error in outcome.errors {
                report.record_error(error);
            }
            outcome.entries
        };

        let discovered_at = Utc::now();
        let added = entries.len();
        for entry in entries {
            merge.push(entry, discovered_at);
        }

        let counters = report.source_mut(&source.id);
        counters.added += added;
        log::sub_item(&format!(
            "parsed {}, added {}, duplicates {}, invalid {}",
            counters.parsed, counters.added, counters.duplicates, counters.invalid
        ));
    }

    let added = merge.added().to_vec();
    let dataset = merge.finish(report.errors.clone());
    report.finished_at = Utc::now();
    report.dataset_count = dataset.count;

    let written = storage.write_dataset(dataset_path, &dataset).await?;

    if let Some(path) = &options.report {
        let contents = report::render(options.report_format, &report, &added)?;
        let meta = storage.write_report(path, &contents).await?;
        log::info(&format!("Report written to {}", meta.location.display()));
    }

    log_summary(&report, &written);

    Ok(RunOutcome {
        dataset,
        report,
        added,
    })
}

/// Configured sources filtered to `ids`, keeping configured order.
fn select_sources<'a>(config: &'a Config, ids: &[String]) -> Result<Vec<&'a SourceDescriptor>> {
    if let Some(unknown) = ids.iter().find(|id| config.source(id).is_none()) {
        return Err(AppError::config(format!("unknown source '{unknown}'")));
    }
    Ok(config
        .sources
        .iter()
        .filter(|s| ids.is_empty() || ids.contains(&s.id))
        .collect())
}

/// Extract and filter one source's blocks, counting as it goes.
fn extract_candidates(
    extractor: &EntryExtractor,
    filter: &CandidateFilter,
    blocks: &[RawBlock],
    counters: &mut SourceReport,
) -> Vec<CandidateEntry> {
    let mut candidates = Vec::new();
    for outcome in extractor.extract_all(blocks) {
        match outcome {
            ExtractOutcome::Entry(entry) => {
                counters.parsed += 1;
                match filter.check(&entry) {
                    Ok(()) => candidates.push(entry),
                    Err(reason) => {
                        counters.invalid += 1;
                        log::debug(&format!("Rejected {}: {}", entry.key(), reason));
                    }
                }
            }
            ExtractOutcome::Invalid(reason) => {
                counters.invalid += 1;
                log::debug(&format!("Invalid entry: {}", reason));
            }
            ExtractOutcome::Heading | ExtractOutcome::Skipped => {}
        }
    }
    candidates
}

fn log_summary(report: &RunReport, written: &WriteMetadata) {
    let totals = report.totals();
    let elapsed = report.finished_at - report.started_at;
    log::summary(
        "Collection complete",
        &[
            ("Sources", report.sources.len().to_string()),
            ("Parsed", totals.parsed.to_string()),
            ("Added", totals.added.to_string()),
            ("Duplicates", totals.duplicates.to_string()),
            ("Invalid", totals.invalid.to_string()),
            ("Not found", totals.not_found.to_string()),
            ("Capped", totals.capped.to_string()),
            ("Errors", report.errors.len().to_string()),
            (
                "Dataset",
                format!("{} records at {}", written.count, written.location.display()),
            ),
            ("Duration", format!("{}s", elapsed.num_seconds())),
        ],
    );
    if report.has_errors() {
        log::warn(&format!(
            "{} non-fatal errors; see the report or the dataset's errors field",
            report.errors.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceKind, resource_key};
    use crate::storage::LocalStorage;
    use crate::testing::{MockApi, MockFetcher};
    use tempfile::TempDir;

    const LIST_A: &str = "\
# Games

## Action
- **[Foo](https://github.com/acme/foo)** - A cool game.
- **[Cool Engine](https://github.com/acme/engine)** - Renders things.
- [Lost](https://github.com/acme/lost) - Gone from the host
";

    const LIST_B: &str = "\
- [Foo again](https://github.com/acme/foo)
- [Bar](https://github.com/acme/bar) - Another game
- [Baz](https://github.com/acme/baz) - Yet another
";

    fn config() -> Config {
        let mut config = Config {
            sources: vec![
                SourceDescriptor::new("a", SourceKind::Document, "https://a.example/list.md"),
                SourceDescriptor::new("b", SourceKind::Document, "https://b.example/list.md"),
            ],
            ..Config::default()
        };
        config.crawler.request_delay_ms = 0;
        config.github.batch_delay_ms = 0;
        config.paths.dataset_file = "games.json".into();
        config
    }

    fn pages() -> MockFetcher {
        MockFetcher::default()
            .with_page("https://a.example/list.md", LIST_A)
            .with_page("https://b.example/list.md", LIST_B)
    }

    fn api() -> MockApi {
        MockApi::default()
            .with_repo("acme", "foo", 10)
            .with_repo("acme", "bar", 50)
            .with_repo("acme", "baz", 5)
    }

    fn keys(dataset: &Dataset) -> Vec<String> {
        dataset.games.iter().map(CanonicalRecord::key).collect()
    }

    #[tokio::test]
    async fn two_sources_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());

        let outcome = run_collector(&config(), &RunOptions::default(), &storage, &pages, &api)
            .await
            .unwrap();

        // Sorted by stars; the not-found entry has none and sorts last.
        assert_eq!(
            keys(&outcome.dataset),
            vec!["acme/bar", "acme/foo", "acme/baz", "acme/lost"]
        );

        let foo = outcome.dataset.games.iter().find(|r| r.name == "foo").unwrap();
        assert_eq!(foo.source_id, "a");
        assert_eq!(foo.category.as_deref(), Some("Action"));
        assert_eq!(foo.description.as_deref(), Some("A cool game"));
        assert_eq!(foo.stars(), 10);

        let a = &outcome.report.sources[0];
        assert_eq!((a.parsed, a.added, a.invalid, a.not_found), (3, 2, 1, 1));
        let b = &outcome.report.sources[1];
        assert_eq!((b.parsed, b.added, b.duplicates), (3, 2, 1));

        let written = storage.load_dataset(Path::new("games.json")).await.unwrap().unwrap();
        assert_eq!(written.count, 4);
    }

    #[tokio::test]
    async fn second_run_adds_nothing() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());
        let options = RunOptions::default();

        let first = run_collector(&config(), &options, &storage, &pages, &api)
            .await
            .unwrap();
        let second = run_collector(&config(), &options, &storage, &pages, &api)
            .await
            .unwrap();

        assert!(second.added.is_empty());
        assert_eq!(second.report.totals().added, 0);
        assert_eq!(second.dataset.games, first.dataset.games);
    }

    #[tokio::test]
    async fn skip_enrichment_makes_no_metadata_calls() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());
        let options = RunOptions {
            skip_enrichment: true,
            ..RunOptions::default()
        };

        let outcome = run_collector(&config(), &options, &storage, &pages, &api)
            .await
            .unwrap();

        assert_eq!(outcome.dataset.count, 4);
        assert!(outcome.dataset.games.iter().all(|r| r.github.is_none()));
        assert!(api.repository_calls().is_empty());
        assert!(!outcome.report.enriched);
        assert_eq!(outcome.report.totals().not_found, 0);
    }

    #[tokio::test]
    async fn failed_lookups_and_fetches_are_recorded() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let pages = MockFetcher::default().with_page("https://a.example/list.md", LIST_A);
        let api = api().with_failure("acme", "foo");

        let outcome = run_collector(&config(), &RunOptions::default(), &storage, &pages, &api)
            .await
            .unwrap();

        assert_eq!(keys(&outcome.dataset), vec!["acme/lost"]);
        assert_eq!(outcome.report.errors.len(), 2);
        assert_eq!(outcome.report.sources[0].errors, 1);
        assert_eq!(outcome.report.sources[1].errors, 1);
        assert_eq!(outcome.dataset.errors, outcome.report.errors);
    }

    #[tokio::test]
    async fn cap_limits_new_entries_per_source() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());
        let options = RunOptions {
            sources: vec!["b".into()],
            max_new_per_source: Some(1),
            ..RunOptions::default()
        };

        let outcome = run_collector(&config(), &options, &storage, &pages, &api)
            .await
            .unwrap();

        assert_eq!(keys(&outcome.dataset), vec!["acme/foo"]);
        assert_eq!(outcome.report.sources.len(), 1);
        assert_eq!(outcome.report.sources[0].capped, 2);
    }

    #[tokio::test]
    async fn alternate_dataset_counts_as_known() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());

        let seed = run_collector(
            &config(),
            &RunOptions {
                sources: vec!["a".into()],
                output: Some("alt.json".into()),
                ..RunOptions::default()
            },
            &storage,
            &pages,
            &api,
        )
        .await
        .unwrap();
        assert_eq!(seed.dataset.count, 2);

        let outcome = run_collector(
            &config(),
            &RunOptions {
                dedup_dataset: Some("alt.json".into()),
                ..RunOptions::default()
            },
            &storage,
            &pages,
            &api,
        )
        .await
        .unwrap();

        let added: Vec<_> = outcome.added.iter().map(CanonicalRecord::key).collect();
        assert_eq!(added, vec![resource_key("acme", "bar"), resource_key("acme", "baz")]);
    }

    #[tokio::test]
    async fn required_dataset_must_exist() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());
        let options = RunOptions {
            require_dataset: true,
            ..RunOptions::default()
        };

        let err = run_collector(&config(), &options, &storage, &pages, &api)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DatasetUnavailable { .. }));
        assert!(pages.requested().is_empty());
        assert!(!tmp.path().join("games.json").exists());
    }

    #[tokio::test]
    async fn unknown_source_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());
        let options = RunOptions {
            sources: vec!["nope".into()],
            ..RunOptions::default()
        };

        let result = run_collector(&config(), &options, &storage, &pages, &api).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn markdown_report_is_written() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let (pages, api) = (pages(), api());
        let options = RunOptions {
            report: Some("report.md".into()),
            report_format: ReportFormat::Markdown,
            ..RunOptions::default()
        };

        run_collector(&config(), &options, &storage, &pages, &api)
            .await
            .unwrap();

        let md = std::fs::read_to_string(tmp.path().join("report.md")).unwrap();
        assert!(md.contains("### a"));
        assert!(md.contains("[Bar](https://github.com/acme/bar) (50 stars)"));
    }
}
