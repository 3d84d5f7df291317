//! Keyword filter for entries that are not games.
//!
//! Titles are matched by plain substring, so a keyword such as "mod" also
//! rejects "Modern Tanks". Descriptions only reject when they open with a
//! keyword, optionally after an article and one qualifier word
//! ("A game engine for ...", "Framework for ...").

use crate::models::{CandidateEntry, ExtractionConfig};

/// Articles allowed before a keyword at the start of a description.
const ARTICLES: &[&str] = &["a", "an", "the"];

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Title(String),
    Description(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Title(k) => write!(f, "title contains '{k}'"),
            Rejection::Description(k) => write!(f, "description opens with '{k}'"),
        }
    }
}

/// Rejects candidates whose title or description marks them as non-games.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    keywords: Vec<String>,
}

impl CandidateFilter {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_keywords(config.denied_keywords.iter().map(String::as_str))
    }

    pub fn with_keywords<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Check a candidate, returning the reason when it is rejected.
    pub fn check(&self, entry: &CandidateEntry) -> Result<(), Rejection> {
        let title = entry.title.to_lowercase();
        if let Some(keyword) = self.keywords.iter().find(|k| title.contains(k.as_str())) {
            return Err(Rejection::Title(keyword.clone()));
        }

        if let Some(description) = &entry.description {
            if let Some(keyword) = self.leading_keyword(description) {
                return Err(Rejection::Description(keyword));
            }
        }
        Ok(())
    }

    fn leading_keyword(&self, description: &str) -> Option<String> {
        let lowered = description.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let skip = usize::from(words.first().is_some_and(|w| ARTICLES.contains(w)));
        let rest = &words[skip.min(words.len())..];

        // The keyword may be the first word, or follow a single qualifier.
        for offset in 0..=1 {
            let Some(tail) = rest.get(offset..) else {
                break;
            };
            let phrase = tail.join(" ");
            if let Some(keyword) = self
                .keywords
                .iter()
                .find(|k| phrase == **k || phrase.starts_with(&format!("{k} ")))
            {
                return Some(keyword.clone());
            }
        }
        None
    }
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}
