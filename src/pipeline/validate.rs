// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::Config;
use crate::utils::log;

/// Load and validate a configuration file, listing what it defines.
pub fn run_validate(path: &Path) -> Result<Config> {
    log::header("Validating configuration");

    let config = match Config::load(path).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            log::error(&format!("Configuration {} is invalid: {}", path.display(), e));
            return Err(e);
        }
    };

    log::info(&format!("Configuration OK: {}", path.display()));
    log::sub_item(&format!("User agent: {}", config.crawler.user_agent));
    log::sub_item(&format!("Timeout: {}s", config.crawler.timeout_secs));
    log::sub_item(&format!(
        "Enrichment: batches of {}, {}ms apart, quota threshold {}",
        config.github.batch_size, config.github.batch_delay_ms, config.github.quota_threshold
    ));
    log::sub_item(&format!("Dataset: {}", config.paths.dataset_file));
    log::sub_item(&format!("Denied keywords: {}", config.extraction.denied_keywords.len()));
    log::sub_item(&format!("Sources: {}", config.sources.len()));
    for source in &config.sources {
        log::sub_item(&format!(
            "  {} ({}) {}",
            source.id,
            source.kind.as_str(),
            source.locator
        ));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn accepts_a_minimal_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[sources]]
id = "list"
kind = "document"
locator = "https://example.com/README.md"
"#,
        )
        .unwrap();

        let config = run_validate(&path).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.github.batch_size, 10);
    }

    #[test]
    fn rejects_duplicate_source_ids() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[sources]]
id = "list"
kind = "document"
locator = "a.md"

[[sources]]
id = "list"
kind = "document"
locator = "b.md"
"#,
        )
        .unwrap();

        assert!(run_validate(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(run_validate(&tmp.path().join("nope.toml")).is_err());
    }
}
