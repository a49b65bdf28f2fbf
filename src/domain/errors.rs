//! Domain errors for the Hypercycle engine.

use thiserror::Error;

use super::models::CyclePhase;

/// Failures of the external reasoning provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Credentials missing or rejected. Locks the engine until cleared.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting, overload or network trouble; the operator may retry.
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// Any other provider failure.
    #[error("Provider error: {0}")]
    Unknown(String),

    /// Dropped from the dispatcher queue before it started.
    #[error("Request aborted before it started")]
    Aborted,
}

impl ProviderError {
    /// Worth retrying later.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Credentials problem; locks the engine.
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Dropped from the queue before starting.
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Authentication(format!("HTTP {status}: {body}")),
            408 | 429 | 500..=599 => Self::Transient(format!("HTTP {status}: {body}")),
            _ => Self::Unknown(format!("HTTP {status}: {body}")),
        }
    }
}

/// Persistence failures of the history and criteria stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON could not be read or written.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Update requested on an empty history.
    #[error("History is empty; nothing to update")]
    EmptyHistory,
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation not allowed in the current phase.
    #[error("Invalid cycle transition from {from} to {to}")]
    InvalidTransition { from: CyclePhase, to: CyclePhase },

    /// Locked after an authentication failure.
    #[error("Engine is locked after an authentication failure; fix credentials and clear the lock")]
    AuthLocked,

    /// A provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Fail-safe criteria out of range.
    #[error("Invalid fail-safe criteria: {0}")]
    InvalidCriteria(String),

    /// Blank goal.
    #[error("Suggestion cannot be empty")]
    EmptySuggestion,

    /// No continuous cycle to wait for.
    #[error("No continuous cycle is running")]
    NoActiveCycle,

    /// The continuous driver task panicked or was aborted.
    #[error("Cycle driver stopped unexpectedly: {0}")]
    Driver(String),
}

/// Result of engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(ProviderError::from_status(401, "bad key").is_authentication());
        assert!(ProviderError::from_status(403, "").is_authentication());
        assert!(ProviderError::from_status(429, "slow down").is_transient());
        assert!(ProviderError::from_status(503, "").is_transient());
        assert!(matches!(
            ProviderError::from_status(400, "bad request"),
            ProviderError::Unknown(_)
        ));
    }

    #[test]
    fn test_transition_message() {
        let err = EngineError::InvalidTransition {
            from: CyclePhase::Halted,
            to: CyclePhase::ContinuousRunning,
        };
        assert_eq!(
            err.to_string(),
            "Invalid cycle transition from halted to continuous_running"
        );
    }
}
