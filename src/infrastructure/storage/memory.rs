use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::StoreError;
use crate::domain::models::{FailSafeCriteria, FailSafeReport, HistoricalRecord};
use crate::domain::ports::{CriteriaStore, HaltStore, HistoryStore};

/// Volatile history, used by tests and dry runs.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<HistoricalRecord>>,
}

impl InMemoryHistoryStore {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records.
    pub fn with_records(records: Vec<HistoricalRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, record: HistoricalRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<HistoricalRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn update_last(&self, record: HistoricalRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let last = records.last_mut().ok_or(StoreError::EmptyHistory)?;
        *last = record;
        Ok(())
    }
}

/// Volatile criteria; loads the defaults until something is saved.
#[derive(Default)]
pub struct InMemoryCriteriaStore {
    criteria: RwLock<Option<FailSafeCriteria>>,
}

impl InMemoryCriteriaStore {
    /// Store holding no saved criteria.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CriteriaStore for InMemoryCriteriaStore {
    async fn load(&self) -> Result<FailSafeCriteria, StoreError> {
        Ok(self.criteria.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, criteria: &FailSafeCriteria) -> Result<(), StoreError> {
        *self.criteria.write().await = Some(criteria.clone());
        Ok(())
    }
}

/// Volatile halt flag. The default for engines without persistence.
#[derive(Default)]
pub struct InMemoryHaltStore {
    report: RwLock<Option<FailSafeReport>>,
}

impl InMemoryHaltStore {
    /// Store with no outstanding halt.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HaltStore for InMemoryHaltStore {
    async fn load(&self) -> Result<Option<FailSafeReport>, StoreError> {
        Ok(self.report.read().await.clone())
    }

    async fn save(&self, report: Option<&FailSafeReport>) -> Result<(), StoreError> {
        *self.report.write().await = report.cloned();
        Ok(())
    }
}
