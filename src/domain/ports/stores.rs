//! Persistence ports for cycle history and fail-safe criteria.

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::models::{FailSafeCriteria, FailSafeReport, HistoricalRecord};

/// Append-only history of finished cycles, oldest first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Add a record after the newest one.
    async fn append(&self, record: HistoricalRecord) -> Result<(), StoreError>;

    /// Every record, oldest first. Empty when nothing was stored yet.
    async fn read_all(&self) -> Result<Vec<HistoricalRecord>, StoreError>;

    /// Replace the most recent record. Fails on an empty history.
    async fn update_last(&self, record: HistoricalRecord) -> Result<(), StoreError>;
}

/// Storage of the operator's fail-safe thresholds.
#[async_trait]
pub trait CriteriaStore: Send + Sync {
    /// Stored criteria, or the defaults when nothing was saved yet.
    async fn load(&self) -> Result<FailSafeCriteria, StoreError>;

    /// Replace the stored criteria.
    async fn save(&self, criteria: &FailSafeCriteria) -> Result<(), StoreError>;
}

/// Storage of an unacknowledged fail-safe halt, so it survives restarts.
#[async_trait]
pub trait HaltStore: Send + Sync {
    /// The outstanding halt, if any.
    async fn load(&self) -> Result<Option<FailSafeReport>, StoreError>;

    /// Record a halt, or clear it with `None`.
    async fn save(&self, report: Option<&FailSafeReport>) -> Result<(), StoreError>;
}
