use crate::domain::models::{CycleState, FailSafeReport, LogEntry, QueueSnapshot};

/// Receives engine notifications. Every method defaults to a no-op.
///
/// Callbacks run synchronously on the notifying task and must not block.
pub trait EngineObserver: Send + Sync {
    /// Dispatcher queue depth changed.
    fn on_queue_state_changed(&self, _snapshot: QueueSnapshot) {}

    /// Phase, timing or counters changed.
    fn on_cycle_state_changed(&self, _state: &CycleState) {}

    /// An entry was written or settled.
    fn on_log_appended(&self, _entry: &LogEntry) {}

    /// The fail-safe halted the engine.
    fn on_fail_safe_triggered(&self, _report: &FailSafeReport) {}
}
