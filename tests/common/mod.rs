//! Common test utilities for integration tests
//!
//! Shared fixtures for building engines against the scripted provider.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hypercycle::domain::models::{
    CycleConfig, CycleState, DispatcherConfig, FailSafeReport, HistoricalRecord, LogEntry,
    QueueSnapshot,
};
use hypercycle::domain::ports::EngineObserver;
use hypercycle::infrastructure::storage::InMemoryHistoryStore;
use hypercycle::{CycleEngine, MockProvider};

/// Cycle timing scaled down for paused-clock tests.
pub fn fast_cycle() -> CycleConfig {
    CycleConfig {
        base_duration_ms: 3_000,
        max_overtime_ms: 60_000,
        tick_interval_ms: 1_000,
        deadline_poll_ms: 500,
    }
}

/// Dispatcher without spacing so tests can run on tokio's paused clock.
pub const fn unspaced() -> DispatcherConfig {
    DispatcherConfig {
        max_concurrent: 1,
        min_spacing_ms: 0,
    }
}

/// Scripted provider taking one second per call.
pub fn slow_provider() -> Arc<MockProvider> {
    Arc::new(MockProvider::new().with_delay(Duration::from_secs(1)))
}

pub async fn build_engine(
    provider: Arc<MockProvider>,
    history: Arc<InMemoryHistoryStore>,
) -> CycleEngine {
    CycleEngine::builder(provider)
        .with_cycle_config(fast_cycle())
        .with_dispatcher_config(unspaced())
        .with_history_store(history)
        .build()
        .await
        .expect("engine should build")
}

/// A prior record that no fail-safe check can object to.
pub fn neutral_record() -> HistoricalRecord {
    HistoricalRecord::pending("warm-up")
}

/// Observer recording every notification as a short line.
#[derive(Default)]
pub struct RecordingObserver {
    pub name: &'static str,
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub fn shared(name: &'static str, events: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self { name, events })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(format!("{}:{event}", self.name));
    }
}

impl EngineObserver for RecordingObserver {
    fn on_queue_state_changed(&self, snapshot: QueueSnapshot) {
        self.push(format!(
            "queue {}/{}/{}",
            snapshot.queued, snapshot.running, snapshot.executing
        ));
    }

    fn on_cycle_state_changed(&self, state: &CycleState) {
        self.push(format!("phase {}", state.phase));
    }

    fn on_log_appended(&self, entry: &LogEntry) {
        let kind = if entry.provisional { "provisional" } else { "final" };
        self.push(format!("log {kind} {}", entry.role));
    }

    fn on_fail_safe_triggered(&self, report: &FailSafeReport) {
        self.push(format!("halt {}", report.triggered_criterion));
    }
}
