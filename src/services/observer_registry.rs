//! Fan-out of engine notifications to subscribed observers.

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::models::{CycleState, FailSafeReport, LogEntry, QueueSnapshot};
use crate::domain::ports::EngineObserver;

/// Handle returned by [`ObserverRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Arc<dyn EngineObserver>)>,
}

/// Observers are notified in subscription order.
///
/// The subscriber list is copied before delivery, so callbacks may subscribe
/// or unsubscribe without deadlocking.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<Mutex<Subscribers>>,
}

impl ObserverRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; it is notified after those already subscribed.
    pub fn subscribe(&self, observer: Arc<dyn EngineObserver>) -> SubscriptionId {
        let mut subs = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(subs.next_id);
        subs.next_id += 1;
        subs.entries.push((id, observer));
        id
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subs.entries.len();
        subs.entries.retain(|(sid, _)| *sid != id);
        subs.entries.len() != before
    }

    /// Number of subscribed observers.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn EngineObserver>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect()
    }

    /// Notify every observer of a queue change.
    pub fn queue_state_changed(&self, snapshot: QueueSnapshot) {
        for observer in self.snapshot() {
            observer.on_queue_state_changed(snapshot);
        }
    }

    /// Notify every observer of a state change.
    pub fn cycle_state_changed(&self, state: &CycleState) {
        for observer in self.snapshot() {
            observer.on_cycle_state_changed(state);
        }
    }

    /// Notify every observer of a log entry.
    pub fn log_appended(&self, entry: &LogEntry) {
        for observer in self.snapshot() {
            observer.on_log_appended(entry);
        }
    }

    /// Notify every observer of a halt.
    pub fn fail_safe_triggered(&self, report: &FailSafeReport) {
        for observer in self.snapshot() {
            observer.on_fail_safe_triggered(report);
        }
    }
}
