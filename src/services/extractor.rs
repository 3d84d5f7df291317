// src/services/extractor.rs

//! Entry extraction from raw blocks.
//!
//! Markdown lines go through ordered matcher cascades, one per field. Each
//! matcher has the same shape (`&str -> Option<T>`) and the first hit wins,
//! so precedence is the order of the slices below. HTML pages go through a
//! single link pass that keeps every anchor pointing at the resource host.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::models::{BlockFormat, CandidateEntry, ExtractionConfig, RESOURCE_HOST, RawBlock};
use crate::utils::{get_domain, resolve};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+").unwrap());
static BOLD_LINK_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\s*\[([^\[\]]+)\]\(([^)\s]*)\)\s*\*\*").unwrap());
static BOLD_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+?)\*\*").unwrap());
static LEADING_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+\[([^\[\]]+)\]\(([^)\s]*)\)").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]\(([^)\s]*)\)").unwrap());
static SOURCE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\[\[?\s*(?:source|src|code|repo|repository|github)\s*\]?\]\((https?://[^)\s]+)\)",
    )
    .unwrap()
});
static BARE_RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://(?:www\.)?github\.com/[^\s)\]>"'`]+"#).unwrap()
});
static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static REPO_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?github\.com/([^/\s?#]+)/([^/\s?#]+)").unwrap()
});
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

/// Link texts that label a cross-reference rather than name an entry.
const LOCATOR_LABELS: &[&str] = &["source", "src", "code", "repo", "repository", "github"];

/// Descriptions shorter than this are treated as absent.
const MIN_DESCRIPTION_LEN: usize = 3;

/// A title and the byte range of the markup it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch {
    pub text: String,
    pub span: Range<usize>,
}

type TitleMatcher = fn(&str) -> Option<TitleMatch>;
type UrlMatcher = fn(&str) -> Option<String>;

const TITLE_MATCHERS: &[TitleMatcher] = &[
    bold_link_title,
    plain_bold_title,
    leading_link_title,
    any_link_title,
];

const LOCATOR_MATCHERS: &[UrlMatcher] = &[source_reference, resource_link, bare_resource_url];

/// Fold a matcher cascade, returning the first hit.
fn first_match<T>(matchers: &[fn(&str) -> Option<T>], text: &str) -> Option<T> {
    matchers.iter().find_map(|matcher| matcher(text))
}

fn bold_link_title(line: &str) -> Option<TitleMatch> {
    let caps = BOLD_LINK_TITLE_RE.captures(line)?;
    title_from(&caps, 1)
}

fn plain_bold_title(line: &str) -> Option<TitleMatch> {
    let caps = BOLD_TITLE_RE.captures(line)?;
    title_from(&caps, 1)
}

fn leading_link_title(line: &str) -> Option<TitleMatch> {
    let caps = LEADING_LINK_RE.captures(line)?;
    title_from(&caps, 1).filter(|t| !is_locator_label(&t.text))
}

fn any_link_title(line: &str) -> Option<TitleMatch> {
    LINK_RE
        .captures_iter(line)
        .filter_map(|caps| title_from(&caps, 1))
        .find(|t| !is_locator_label(&t.text))
}

fn title_from(caps: &regex::Captures<'_>, group: usize) -> Option<TitleMatch> {
    let whole = caps.get(0)?;
    let text = clean_inline(caps.get(group)?.as_str());
    if text.is_empty() {
        return None;
    }
    Some(TitleMatch {
        text,
        span: whole.range(),
    })
}

fn is_locator_label(text: &str) -> bool {
    LOCATOR_LABELS.contains(&text.trim().to_lowercase().as_str())
}

fn source_reference(line: &str) -> Option<String> {
    SOURCE_REF_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .find(|url| is_resource_url(url))
}

fn resource_link(line: &str) -> Option<String> {
    LINK_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(2).map(|m| m.as_str().to_string()))
        .find(|url| is_resource_url(url))
}

/// Sentence punctuation directly after a bare URL is not part of it.
fn bare_resource_url(line: &str) -> Option<String> {
    BARE_RESOURCE_RE.find(line).map(|m| {
        m.as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?'])
            .to_string()
    })
}

fn is_resource_url(url: &str) -> bool {
    get_domain(url).is_some_and(|host| host == RESOURCE_HOST)
}

/// Strip inline markdown from a short fragment and normalize whitespace.
fn clean_inline(text: &str) -> String {
    let text = LINK_RE.replace_all(text, "$1");
    let text = text.replace("**", "").replace("__", "").replace(['*', '`'], "");
    let text = text.replace("~~", "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_description(fragment: &str) -> Option<String> {
    let text = LINK_RE.replace_all(fragment, "$1");
    let text = BARE_URL_RE.replace_all(&text, "");
    let text = clean_inline(&text).replace("()", "");
    let text = text
        .trim()
        .trim_start_matches(|c: char| matches!(c, '-' | '–' | '—' | ':' | '|' | ',') || c.is_whitespace())
        .trim_end_matches(|c: char| matches!(c, '(' | '[') || c.is_whitespace())
        .trim_end_matches('.')
        .trim();

    if text.chars().count() < MIN_DESCRIPTION_LEN {
        None
    } else {
        Some(text.to_string())
    }
}

/// Section heading context carried through one source pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionContext {
    pub category: Option<String>,
}

/// What a single block produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// A section heading; the context was updated
    Heading,
    /// Not an entry (prose, non-list line, no title or locator)
    Skipped,
    /// Looked like an entry but the resource path is unusable
    Invalid(String),
    Entry(CandidateEntry),
}

/// Converts raw blocks into candidate entries.
pub struct EntryExtractor {
    excluded_headings: Vec<String>,
    denied_segments: HashSet<String>,
    anchor_selector: Selector,
}

impl EntryExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            excluded_headings: config
                .excluded_headings
                .iter()
                .map(|h| h.to_lowercase())
                .collect(),
            denied_segments: config
                .denied_segments
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            anchor_selector: Selector::parse("a[href]").expect("static selector"),
        }
    }

    /// Extract every block of one source pass, in order.
    ///
    /// The heading context starts empty for each pass.
    pub fn extract_all(&self, blocks: &[RawBlock]) -> Vec<ExtractOutcome> {
        let mut context = SectionContext::default();
        let mut outcomes = Vec::new();
        for block in blocks {
            match block.format {
                BlockFormat::Markdown => outcomes.push(self.extract_line(block, &mut context)),
                BlockFormat::Html => outcomes.extend(self.extract_html(block)),
            }
        }
        outcomes
    }

    /// Extract at most one entry from a markdown line.
    pub fn extract_line(&self, block: &RawBlock, context: &mut SectionContext) -> ExtractOutcome {
        let line = block.text.trim_end();

        if let Some(caps) = HEADING_RE.captures(line) {
            let level = caps[1].len();
            if !(2..=4).contains(&level) {
                return ExtractOutcome::Skipped;
            }
            self.apply_heading(&caps[2], context);
            return ExtractOutcome::Heading;
        }

        if !BULLET_RE.is_match(line) || !line.to_lowercase().contains(RESOURCE_HOST) {
            return ExtractOutcome::Skipped;
        }

        let Some(title) = first_match(TITLE_MATCHERS, line) else {
            return ExtractOutcome::Skipped;
        };
        let Some(locator) = first_match(LOCATOR_MATCHERS, line) else {
            return ExtractOutcome::Skipped;
        };
        let (owner, name) = match self.parse_repo(&locator) {
            Ok(parts) => parts,
            Err(reason) => return ExtractOutcome::Invalid(reason),
        };

        let mut entry = CandidateEntry::new(title.text.clone(), &owner, &name, &block.source_id);
        entry.description = Self::description(line, &title);
        entry.homepage = Self::homepage(line, &locator);
        entry.category = context.category.clone();
        ExtractOutcome::Entry(entry)
    }

    /// Pull every resource link out of an HTML page.
    ///
    /// Blocks carrying a title hint are item pages and yield at most one
    /// entry, titled by the hint.
    pub fn extract_html(&self, block: &RawBlock) -> Vec<ExtractOutcome> {
        let document = Html::parse_document(&block.text);
        let single = block.title_hint.is_some();
        let mut outcomes = Vec::new();

        for anchor in document.select(&self.anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let url = match &block.origin_url {
                Some(base) => resolve(base, href).unwrap_or_else(|| href.to_string()),
                None => href.to_string(),
            };
            if !is_resource_url(&url) {
                continue;
            }

            match self.parse_repo(&url) {
                Ok((owner, name)) => {
                    let anchor_text = clean_inline(&anchor.text().collect::<String>());
                    let title = block
                        .title_hint
                        .clone()
                        .filter(|t| !t.trim().is_empty())
                        .or_else(|| (!anchor_text.is_empty()).then_some(anchor_text))
                        .unwrap_or_else(|| name.clone());
                    let entry = CandidateEntry::new(title, &owner, &name, &block.source_id);
                    if single {
                        return vec![ExtractOutcome::Entry(entry)];
                    }
                    outcomes.push(ExtractOutcome::Entry(entry));
                }
                Err(reason) if !single => outcomes.push(ExtractOutcome::Invalid(reason)),
                Err(_) => {}
            }
        }

        if single && outcomes.is_empty() {
            log::debug!(
                "No repository link on item page {}",
                block.origin_url.as_deref().unwrap_or("?")
            );
        }
        outcomes
    }

    /// Split a resource URL into a validated owner/name pair.
    pub fn parse_repo(&self, url: &str) -> Result<(String, String), String> {
        let caps = REPO_PATH_RE
            .captures(url.trim())
            .ok_or_else(|| format!("not a repository URL: {url}"))?;
        let owner = caps[1].trim().to_string();
        let name = caps[2].trim();
        let name = name.strip_suffix(".git").unwrap_or(name).to_string();

        for segment in [&owner, &name] {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(format!("empty path segment in {url}"));
            }
            if !SEGMENT_RE.is_match(segment) {
                return Err(format!("malformed path segment '{segment}' in {url}"));
            }
        }
        if self.denied_segments.contains(&owner.to_lowercase()) {
            return Err(format!("'{owner}' is a site section, not an owner"));
        }
        Ok((owner, name))
    }

    fn apply_heading(&self, raw: &str, context: &mut SectionContext) {
        let heading = clean_inline(raw);
        let lowered = heading.to_lowercase();
        let excluded = self
            .excluded_headings
            .iter()
            .any(|h| lowered.contains(h.as_str()));

        context.category = if excluded || heading.is_empty() {
            None
        } else {
            Some(heading)
        };
    }

    fn description(line: &str, title: &TitleMatch) -> Option<String> {
        let start = title.span.end;
        let end = SOURCE_REF_RE
            .find_at(line, start)
            .map_or(line.len(), |m| m.start());
        clean_description(&line[start..end])
    }

    fn homepage(line: &str, locator: &str) -> Option<String> {
        LINK_RE
            .captures_iter(line)
            .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
            .find(|url| *url != locator && !is_resource_url(url))
            .map(String::from)
    }
}

impl Default for EntryExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> RawBlock {
        RawBlock::markdown("list", text)
    }

    fn entry(outcome: ExtractOutcome) -> CandidateEntry {
        match outcome {
            ExtractOutcome::Entry(entry) => entry,
            other => panic!("expected an entry, got {other:?}"),
        }
    }

    #[test]
    fn extracts_bold_link_entry_with_source_reference() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        let block = line(
            "- **[Foo](http://example.com)** - A cool game. [[source]](https://github.com/acme/foo)",
        );

        let entry = entry(extractor.extract_line(&block, &mut ctx));
        assert_eq!(entry.title, "Foo");
        assert_eq!(entry.owner, "acme");
        assert_eq!(entry.name, "foo");
        assert_eq!(entry.description.as_deref(), Some("A cool game"));
        assert_eq!(entry.homepage.as_deref(), Some("http://example.com"));
        assert_eq!(entry.repo_url, "https://github.com/acme/foo");
        assert_eq!(entry.source_id, "list");
    }

    #[test]
    fn contributing_heading_clears_category() {
        let extractor = EntryExtractor::default();
        let blocks = vec![
            line("## Strategy"),
            line("- [Freeciv](https://github.com/freeciv/freeciv) - Civilization clone"),
            line("## Contributing"),
            line("- [Bar](https://github.com/acme/bar) - Should not be categorized"),
        ];

        let entries: Vec<_> = extractor
            .extract_all(&blocks)
            .into_iter()
            .filter_map(|o| match o {
                ExtractOutcome::Entry(e) => Some(e),
                _ => None,
            })
            .collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category.as_deref(), Some("Strategy"));
        assert_eq!(entries[1].category, None);
    }

    #[test]
    fn level_one_and_five_headings_leave_context_alone() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext {
            category: Some("Puzzle".into()),
        };
        assert_eq!(
            extractor.extract_line(&line("# Awesome Games"), &mut ctx),
            ExtractOutcome::Skipped
        );
        assert_eq!(
            extractor.extract_line(&line("##### Tiny"), &mut ctx),
            ExtractOutcome::Skipped
        );
        assert_eq!(ctx.category.as_deref(), Some("Puzzle"));
    }

    #[test]
    fn skips_non_list_lines_and_lines_without_resource_links() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        assert_eq!(
            extractor.extract_line(&line("See https://github.com/acme/foo for details"), &mut ctx),
            ExtractOutcome::Skipped
        );
        assert_eq!(
            extractor.extract_line(&line("- [Foo](https://foo.io) - homepage only"), &mut ctx),
            ExtractOutcome::Skipped
        );
    }

    #[test]
    fn plain_bold_title_with_bare_url() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        let block = line("* **Space Rocks** https://github.com/someone/space-rocks.git");

        let entry = entry(extractor.extract_line(&block, &mut ctx));
        assert_eq!(entry.title, "Space Rocks");
        assert_eq!(entry.owner, "someone");
        assert_eq!(entry.name, "space-rocks");
        assert_eq!(entry.description, None);
    }

    #[test]
    fn bare_url_ending_a_sentence_keys_like_a_markdown_link() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        let bare = entry(extractor.extract_line(
            &line("- **Space Rocks** - play it at https://github.com/someone/space-rocks."),
            &mut ctx,
        ));
        let linked = entry(extractor.extract_line(
            &line("- [Space Rocks](https://github.com/someone/space-rocks)"),
            &mut ctx,
        ));

        assert_eq!(bare.key(), "someone/space-rocks");
        assert_eq!(bare.key(), linked.key());
        assert_eq!(bare.repo_url, "https://github.com/someone/space-rocks");
    }

    #[test]
    fn source_reference_wins_over_positional_link() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        let block = line(
            "- [Fork](https://github.com/mirror/game) - mirror ([source](https://github.com/upstream/game))",
        );

        let entry = entry(extractor.extract_line(&block, &mut ctx));
        assert_eq!(entry.title, "Fork");
        assert_eq!(entry.owner, "upstream");
        assert_eq!(entry.description.as_deref(), Some("mirror"));
    }

    #[test]
    fn source_label_is_never_a_title() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        let block = line("- [source](https://github.com/acme/foo)");
        assert_eq!(extractor.extract_line(&block, &mut ctx), ExtractOutcome::Skipped);
    }

    #[test]
    fn denied_owner_segment_is_invalid() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        let block = line("- [Game topic](https://github.com/topics/game)");
        assert!(matches!(
            extractor.extract_line(&block, &mut ctx),
            ExtractOutcome::Invalid(_)
        ));
    }

    #[test]
    fn owner_only_url_is_invalid() {
        let extractor = EntryExtractor::default();
        assert!(extractor.parse_repo("https://github.com/acme").is_err());
        assert!(extractor.parse_repo("https://github.com/acme/..").is_err());
        assert_eq!(
            extractor.parse_repo("https://www.github.com/Acme/Foo/tree/main"),
            Ok(("Acme".to_string(), "Foo".to_string()))
        );
    }

    #[test]
    fn short_description_is_absent() {
        let extractor = EntryExtractor::default();
        let mut ctx = SectionContext::default();
        let block = line("- [Foo](https://github.com/acme/foo) - ok.");
        assert_eq!(entry(extractor.extract_line(&block, &mut ctx)).description, None);
    }

    #[test]
    fn title_cascade_order() {
        let both = "- **Bold** [Linked](https://github.com/a/b)";
        assert_eq!(first_match(TITLE_MATCHERS, both).unwrap().text, "Bold");

        let bold_link = "- **[Inner](https://x.io)** [Other](https://github.com/a/b)";
        assert_eq!(first_match(TITLE_MATCHERS, bold_link).unwrap().text, "Inner");

        let late_link = "- Play [Late](https://github.com/a/b)";
        assert_eq!(first_match(TITLE_MATCHERS, late_link).unwrap().text, "Late");
    }

    #[test]
    fn locator_cascade_order() {
        let text = "[x](https://github.com/a/link) https://github.com/a/bare [[code]](https://github.com/a/ref)";
        assert_eq!(
            first_match(LOCATOR_MATCHERS, text).as_deref(),
            Some("https://github.com/a/ref")
        );
        let text = "https://github.com/a/bare [x](https://github.com/a/link)";
        assert_eq!(
            first_match(LOCATOR_MATCHERS, text).as_deref(),
            Some("https://github.com/a/link")
        );
    }

    #[test]
    fn html_page_yields_every_repository_link() {
        let extractor = EntryExtractor::default();
        let html = r#"
            <html><body>
              <a href="https://github.com/acme/foo">Foo Quest</a>
              <a href="https://example.com/about">About</a>
              <a href="https://github.com/sponsors/acme">Sponsor</a>
              <a href="https://github.com/acme/bar"><img src="x.png"></a>
            </body></html>
        "#;
        let block = RawBlock::html("dir", "https://example.com/games", html);

        let outcomes = extractor.extract_html(&block);
        assert_eq!(outcomes.len(), 3);
        let ExtractOutcome::Entry(first) = &outcomes[0] else {
            panic!("expected entry");
        };
        assert_eq!(first.title, "Foo Quest");
        assert!(matches!(outcomes[1], ExtractOutcome::Invalid(_)));
        let ExtractOutcome::Entry(third) = &outcomes[2] else {
            panic!("expected entry");
        };
        assert_eq!(third.title, "bar");
        assert_eq!(third.category, None);
    }

    #[test]
    fn item_page_uses_title_hint_and_first_link() {
        let extractor = EntryExtractor::default();
        let html = r#"<a href="https://github.com/acme/jumper">code</a>
                      <a href="https://github.com/acme/other">other</a>"#;
        let block = RawBlock::html("tags", "https://itch.example/jumper", html)
            .with_title_hint(Some("Jumper".into()));

        let outcomes = extractor.extract_html(&block);
        assert_eq!(outcomes.len(), 1);
        let ExtractOutcome::Entry(entry) = &outcomes[0] else {
            panic!("expected entry");
        };
        assert_eq!(entry.title, "Jumper");
        assert_eq!(entry.name, "jumper");
    }
}
