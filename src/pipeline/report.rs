// src/pipeline/report.rs

//! Run report rendering.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::Result;
use crate::models::{CanonicalRecord, RunReport};

/// Output format of the run report file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!("unknown report format '{other}' (expected json or markdown)")),
        }
    }
}

/// Popularity bands used to group new entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Popular,
    Notable,
    Emerging,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Popular, Tier::Notable, Tier::Emerging];

    pub fn of(record: &CanonicalRecord) -> Self {
        match record.github.as_ref().map(|m| m.stars) {
            Some(stars) if stars >= 1000 => Tier::Popular,
            Some(stars) if stars >= 100 => Tier::Notable,
            _ => Tier::Emerging,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Popular => "1000+ stars",
            Tier::Notable => "100-999 stars",
            Tier::Emerging => "under 100 stars or unknown",
        }
    }
}

/// Render a report in the requested format.
pub fn render(format: ReportFormat, report: &RunReport, added: &[CanonicalRecord]) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Markdown => Ok(render_markdown(report, added)),
    }
}

/// Markdown summary: counters per source, then new entries grouped by
/// source and popularity tier, then errors.
pub fn render_markdown(report: &RunReport, added: &[CanonicalRecord]) -> String {
    let mut out = String::new();
    let totals = report.totals();

    let _ = writeln!(out, "# Collection report\n");
    let _ = writeln!(
        out,
        "- Started: {}\n- Finished: {}\n- Enrichment: {}\n- Dataset size: {}\n",
        report.started_at.to_rfc3339(),
        report.finished_at.to_rfc3339(),
        if report.enriched { "on" } else { "skipped" },
        report.dataset_count
    );

    let _ = writeln!(
        out,
        "| Source | Parsed | Added | Duplicates | Invalid | Not found | Capped | Errors |"
    );
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|");
    for s in report.sources.iter().chain(std::iter::once(&totals)) {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            s.source_id, s.parsed, s.added, s.duplicates, s.invalid, s.not_found, s.capped, s.errors
        );
    }

    let _ = writeln!(out, "\n## New entries ({})\n", added.len());
    if added.is_empty() {
        let _ = writeln!(out, "No new entries.");
    }
    for source in &report.sources {
        let from_source: Vec<&CanonicalRecord> = added
            .iter()
            .filter(|r| r.source_id == source.source_id)
            .collect();
        if from_source.is_empty() {
            continue;
        }
        let _ = writeln!(out, "### {}\n", source.source_id);
        for tier in Tier::ALL {
            let in_tier: Vec<_> = from_source.iter().filter(|r| Tier::of(r) == tier).collect();
            if in_tier.is_empty() {
                continue;
            }
            let _ = writeln!(out, "#### {}\n", tier.label());
            for record in in_tier {
                let _ = write!(out, "- [{}]({})", record.title, record.repo_url);
                if let Some(meta) = &record.github {
                    let _ = write!(out, " ({} stars)", meta.stars);
                }
                if let Some(description) = &record.description {
                    let _ = write!(out, " - {}", description);
                }
                out.push('\n');
            }
            out.push('\n');
        }
    }

    if report.has_errors() {
        let _ = writeln!(out, "## Errors ({})\n", report.errors.len());
        for error in &report.errors {
            let _ = writeln!(out, "- `{}` {}: {}", error.source_id, error.locator, error.message);
        }
    }
    out
}
