//! JSON file stores.
//!
//! Each store owns one file. Writes go to a sibling temp file that is then
//! renamed over the target, so readers never see a half-written document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::errors::StoreError;
use crate::domain::models::{FailSafeCriteria, FailSafeReport, HistoricalRecord};
use crate::domain::ports::{CriteriaStore, HaltStore, HistoryStore};

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), "store written");
    Ok(())
}

/// History persisted as a JSON array, oldest first.
pub struct JsonFileHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    /// Store backed by `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// File the history lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<HistoricalRecord>, StoreError> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn append(&self, record: HistoricalRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.push(record);
        write_json(&self.path, &records).await
    }

    async fn read_all(&self) -> Result<Vec<HistoricalRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn update_last(&self, record: HistoricalRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let last = records.last_mut().ok_or(StoreError::EmptyHistory)?;
        *last = record;
        write_json(&self.path, &records).await
    }
}

/// Criteria persisted as a JSON object. Missing keys fall back to defaults.
pub struct JsonFileCriteriaStore {
    path: PathBuf,
}

impl JsonFileCriteriaStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CriteriaStore for JsonFileCriteriaStore {
    async fn load(&self) -> Result<FailSafeCriteria, StoreError> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }

    async fn save(&self, criteria: &FailSafeCriteria) -> Result<(), StoreError> {
        write_json(&self.path, criteria).await
    }
}

/// Outstanding halt persisted as the report itself; no file means no halt.
pub struct JsonFileHaltStore {
    path: PathBuf,
}

impl JsonFileHaltStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HaltStore for JsonFileHaltStore {
    async fn load(&self) -> Result<Option<FailSafeReport>, StoreError> {
        read_json(&self.path).await
    }

    async fn save(&self, report: Option<&FailSafeReport>) -> Result<(), StoreError> {
        match report {
            Some(report) => write_json(&self.path, report).await,
            None => match fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "halt cleared");
                    Ok(())
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileHistoryStore::new(dir.path().join("history.json"));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/history.json");

        let store = JsonFileHistoryStore::new(&path);
        store
            .append(HistoricalRecord::pending("first").with_evolved_artifact("fn a() {}"))
            .await
            .unwrap();
        store.append(HistoricalRecord::pending("second")).await.unwrap();

        let reopened = JsonFileHistoryStore::new(&path);
        let records = reopened.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].evolved_artifact_text.as_deref(), Some("fn a() {}"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"suggestionText\""));
        assert!(!raw.contains("cycleDurationSeconds"));
    }

    #[tokio::test]
    async fn test_update_last_on_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileHistoryStore::new(dir.path().join("history.json"));
        assert!(matches!(
            store.update_last(HistoricalRecord::pending("x")).await,
            Err(StoreError::EmptyHistory)
        ));
    }

    #[tokio::test]
    async fn test_criteria_defaults_and_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("criteria.json");
        let store = JsonFileCriteriaStore::new(&path);
        assert_eq!(store.load().await.unwrap(), FailSafeCriteria::default());

        std::fs::write(&path, r#"{"maxCycleDurationSeconds": 300}"#).unwrap();
        let loaded = store.load().await.unwrap();
        assert!((loaded.max_cycle_duration_seconds - 300.0).abs() < f64::EPSILON);
        assert_eq!(loaded.max_bottlenecks, 3);
    }

    #[tokio::test]
    async fn test_halt_survives_reopen_until_cleared() {
        use crate::domain::models::FailSafeCriterion;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/halt.json");
        let store = JsonFileHaltStore::new(&path);
        assert_eq!(store.load().await.unwrap(), None);

        let report = FailSafeReport::new(FailSafeCriterion::LowCodeReuseRate, "reuse fell");
        store.save(Some(&report)).await.unwrap();
        assert_eq!(JsonFileHaltStore::new(&path).load().await.unwrap(), Some(report));

        store.save(None).await.unwrap();
        assert!(!path.exists());
        store.save(None).await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileHistoryStore::new(&path).read_all().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
