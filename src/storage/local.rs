//! Local filesystem storage.
//!
//! Every write goes to a sibling temp file first and is renamed into
//! place, so a crashed run never leaves a truncated dataset behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Dataset;
use crate::storage::{DatasetStorage, WriteMetadata};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Full path for a key.
    pub fn path(&self, key: &Path) -> PathBuf {
        self.root_dir.join(key)
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &Path, value: &T) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self, key: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &Path) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DatasetStorage for LocalStorage {
    async fn load_dataset(&self, key: &Path) -> Result<Option<Dataset>> {
        let dataset: Option<Dataset> = self.read_json(key).await?;
        if let Some(dataset) = &dataset {
            log::debug!(
                "Loaded {} records from {}",
                dataset.games.len(),
                self.path(key).display()
            );
        }
        Ok(dataset)
    }

    async fn write_dataset(&self, key: &Path, dataset: &Dataset) -> Result<WriteMetadata> {
        let location = self.write_json(key, dataset).await?;
        log::info!("Wrote {} records to {}", dataset.count, location.display());
        Ok(WriteMetadata {
            location,
            count: dataset.count,
            timestamp: dataset.updated_at,
        })
    }

    async fn write_report(&self, key: &Path, contents: &str) -> Result<WriteMetadata> {
        let location = self.write_bytes(key, contents.as_bytes()).await?;
        Ok(WriteMetadata {
            location,
            count: 0,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalRecord, RunError};
    use tempfile::TempDir;

    fn record(owner: &str, name: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: format!("{owner}-{name}"),
            slug: name.to_string(),
            title: name.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            repo_url: format!("https://github.com/{owner}/{name}"),
            description: None,
            category: None,
            homepage: None,
            source_id: "list".to_string(),
            discovered_at: Utc::now(),
            github: None,
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes(Path::new("test.txt"), b"hello").await.unwrap();
        let data = storage.read_bytes(Path::new("test.txt")).await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_dataset_is_none() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.load_dataset(Path::new("games.json")).await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_dataset_round_trip_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let dataset = Dataset::new(
            vec![record("acme", "foo")],
            vec![RunError::new("list", "https://x", "timeout")],
        );

        let meta = storage
            .write_dataset(Path::new("nested/games.json"), &dataset)
            .await
            .unwrap();
        assert_eq!(meta.count, 1);
        assert_eq!(meta.location, tmp.path().join("nested/games.json"));

        let loaded = storage
            .load_dataset(Path::new("nested/games.json"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.count, 1);
        assert_eq!(loaded.games[0].key(), "acme/foo");
        assert_eq!(loaded.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_dataset_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("games.json"), "{ not json").unwrap();
        let storage = LocalStorage::new(tmp.path());

        let result = storage.load_dataset(Path::new("games.json")).await;
        assert!(matches!(result, Err(AppError::Json(_))));
    }

    #[tokio::test]
    async fn test_absolute_key_ignores_root() {
        let tmp = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let target = other.path().join("report.md");

        storage.write_report(&target, "# Report\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# Report\n");
    }
}
