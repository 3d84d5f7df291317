// src/pipeline/load.rs

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Dataset;
use crate::storage::DatasetStorage;
use crate::utils::log;

/// Load a dataset for a run.
///
/// A missing or unreadable dataset is treated as empty with a warning,
/// unless `required` is set, in which case it is fatal.
pub async fn load_dataset(
    storage: &dyn DatasetStorage,
    path: &Path,
    required: bool,
) -> Result<Dataset> {
    let reason = match storage.load_dataset(path).await {
        Ok(Some(dataset)) => return Ok(dataset),
        Ok(None) => "file not found".to_string(),
        Err(e) => e.to_string(),
    };

    if required {
        return Err(AppError::DatasetUnavailable {
            path: path.to_path_buf(),
            reason,
        });
    }
    log::warn(&format!(
        "Dataset {} unavailable ({}); starting from an empty dataset",
        path.display(),
        reason
    ));
    Ok(Dataset::empty())
}

/// Show dataset path, record count and last update.
pub async fn run_info(storage: &dyn DatasetStorage, path: &Path) -> Result<Option<Dataset>> {
    log::header("Dataset info");
    log::sub_item(&format!("Path: {}", path.display()));

    let Some(dataset) = storage.load_dataset(path).await? else {
        log::warn("No dataset found. Run 'collect' first.");
        return Ok(None);
    };

    log::sub_item(&format!("Records: {}", dataset.games.len()));
    log::sub_item(&format!("Updated: {}", dataset.updated_at.to_rfc3339()));
    log::sub_item(&format!("Errors from last run: {}", dataset.errors.len()));

    let mut by_source: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &dataset.games {
        *by_source.entry(record.source_id.as_str()).or_default() += 1;
    }
    for (source, count) in &by_source {
        log::sub_item(&format!("  {}: {}", source, count));
    }

    let enriched = dataset.games.iter().filter(|r| r.github.is_some()).count();
    log::sub_item(&format!("With metadata: {}", enriched));

    Ok(Some(dataset))
}
