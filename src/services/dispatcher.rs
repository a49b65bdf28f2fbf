//! Rate-limited dispatch of provider calls.
//!
//! All outbound calls share one dispatcher. Units start in submission order,
//! at most `max_concurrent` run at once, and two starts are never closer than
//! `min_spacing`. Spacing is enforced by a GCRA limiter with a burst of one.

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::ProviderError;
use crate::domain::models::{DispatcherConfig, QueueSnapshot};
use crate::services::observer_registry::ObserverRegistry;

struct Inner {
    slots: Semaphore,
    /// Serializes the spacing wait so starts keep slot order.
    start_gate: AsyncMutex<()>,
    limiter: Option<DefaultDirectRateLimiter>,
    counters: Mutex<QueueSnapshot>,
    observers: ObserverRegistry,
}

impl Inner {
    fn update(&self, change: impl FnOnce(&mut QueueSnapshot)) {
        let snapshot = {
            let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
            change(&mut counters);
            *counters
        };
        debug!(
            queued = snapshot.queued,
            running = snapshot.running,
            executing = snapshot.executing,
            "dispatcher queue changed"
        );
        self.observers.queue_state_changed(snapshot);
    }
}

/// Shared, cloneable handle to the dispatch queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Queued,
    Running,
    Executing,
    Finished,
}

/// Tracks one unit's position in the counters; rolls them back if the unit is dropped.
struct Ticket {
    inner: Arc<Inner>,
    stage: Stage,
}

impl Ticket {
    fn enqueue(inner: &Arc<Inner>) -> Self {
        inner.update(|s| s.queued += 1);
        Self {
            inner: Arc::clone(inner),
            stage: Stage::Queued,
        }
    }

    fn advance(&mut self, next: Stage) {
        let prev = self.stage;
        self.inner.update(|s| {
            match prev {
                Stage::Queued => s.queued -= 1,
                Stage::Running => {}
                Stage::Executing => {
                    s.executing -= 1;
                    s.running -= 1;
                }
                Stage::Finished => return,
            }
            match next {
                Stage::Queued => s.queued += 1,
                Stage::Running => s.running += 1,
                Stage::Executing => s.executing += 1,
                Stage::Finished => {
                    if prev == Stage::Running {
                        s.running -= 1;
                    }
                }
            }
        });
        self.stage = next;
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.stage != Stage::Finished {
            self.advance(Stage::Finished);
        }
    }
}

impl Dispatcher {
    /// Dispatcher reporting queue changes to `observers`.
    pub fn new(config: &DispatcherConfig, observers: ObserverRegistry) -> Self {
        let limiter = Quota::with_period(config.min_spacing())
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        Self {
            inner: Arc::new(Inner {
                slots: Semaphore::new(config.max_concurrent.max(1)),
                start_gate: AsyncMutex::new(()),
                limiter,
                counters: Mutex::new(QueueSnapshot::default()),
                observers,
            }),
        }
    }

    /// Current queue counters.
    pub fn snapshot(&self) -> QueueSnapshot {
        *self
            .inner
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `work` once a slot and the spacing allow it.
    ///
    /// If `abort` fires before the unit starts, the unit is dropped and
    /// [`ProviderError::Aborted`] is returned. Started units always run to
    /// completion; their errors go back to this caller only.
    pub async fn submit<T, F, Fut>(
        &self,
        label: &str,
        work: F,
        abort: Option<&CancellationToken>,
    ) -> Result<T, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let never = CancellationToken::new();
        let abort = abort.unwrap_or(&never);
        let mut ticket = Ticket::enqueue(&self.inner);
        debug!(label, "unit scheduled");

        let _permit = tokio::select! {
            biased;
            () = abort.cancelled() => {
                debug!(label, "unit dropped before acquiring a slot");
                return Err(ProviderError::Aborted);
            }
            permit = self.inner.slots.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(label, "dispatcher closed");
                    return Err(ProviderError::Aborted);
                }
            },
        };
        ticket.advance(Stage::Running);

        if let Some(limiter) = &self.inner.limiter {
            let spaced = async {
                let _gate = self.inner.start_gate.lock().await;
                limiter.until_ready().await;
            };
            tokio::select! {
                biased;
                () = abort.cancelled() => {
                    debug!(label, "unit dropped while waiting for spacing");
                    return Err(ProviderError::Aborted);
                }
                () = spaced => {}
            }
        }

        ticket.advance(Stage::Executing);
        debug!(label, "unit executing");
        let result = work().await;
        ticket.advance(Stage::Finished);

        match &result {
            Ok(_) => debug!(label, "unit done"),
            Err(err) => warn!(label, error = %err, "unit failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::EngineObserver;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn dispatcher(spacing_ms: u64) -> Dispatcher {
        Dispatcher::new(
            &DispatcherConfig {
                max_concurrent: 1,
                min_spacing_ms: spacing_ms,
            },
            ObserverRegistry::new(),
        )
    }

    #[tokio::test]
    async fn test_starts_are_spaced_and_never_overlap() {
        let dispatcher = dispatcher(100);
        let executing = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let submitted = Instant::now();

        let mut handles = Vec::new();
        for i in 0..3 {
            let dispatcher = dispatcher.clone();
            let executing = Arc::clone(&executing);
            let max_seen = Arc::clone(&max_seen);
            let starts = Arc::clone(&starts);
            handles.push(tokio::spawn(async move {
                dispatcher
                    .submit(
                        "unit",
                        || async move {
                            let now = executing.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            starts.lock().unwrap().push((i, Instant::now()));
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            executing.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, ProviderError>(i)
                        },
                        None,
                    )
                    .await
            }));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let starts = starts.lock().unwrap();
        let order: Vec<i32> = starts.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(starts[2].1.duration_since(submitted) >= Duration::from_millis(195));
        assert!(starts[1].1.duration_since(starts[0].1) >= Duration::from_millis(95));
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_units() {
        let dispatcher = dispatcher(0);

        let failed: Result<(), _> = dispatcher
            .submit(
                "bad",
                || async { Err(ProviderError::Transient("overloaded".into())) },
                None,
            )
            .await;
        let ok = dispatcher
            .submit("good", || async { Ok::<_, ProviderError>(7) }, None)
            .await;

        assert!(failed.unwrap_err().is_transient());
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(dispatcher.snapshot(), QueueSnapshot::default());
    }

    #[tokio::test]
    async fn test_abort_drops_queued_unit() {
        let dispatcher = dispatcher(0);
        let ran = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();

        let busy = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .submit(
                        "busy",
                        || async {
                            tokio::time::sleep(Duration::from_millis(150)).await;
                            Ok::<_, ProviderError>(())
                        },
                        None,
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiting = {
            let dispatcher = dispatcher.clone();
            let ran = Arc::clone(&ran);
            let token = token.clone();
            tokio::spawn(async move {
                dispatcher
                    .submit(
                        "waiting",
                        || async move {
                            ran.store(true, Ordering::SeqCst);
                            Ok::<_, ProviderError>(())
                        },
                        Some(&token),
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dispatcher.snapshot().queued, 1);
        token.cancel();

        assert_eq!(waiting.await.unwrap(), Err(ProviderError::Aborted));
        busy.await.unwrap().unwrap();
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(dispatcher.snapshot(), QueueSnapshot::default());
    }

    #[derive(Default)]
    struct SnapshotLog(Mutex<Vec<QueueSnapshot>>);

    impl EngineObserver for SnapshotLog {
        fn on_queue_state_changed(&self, snapshot: QueueSnapshot) {
            self.0.lock().unwrap().push(snapshot);
        }
    }

    #[tokio::test]
    async fn test_reports_every_transition() {
        let observers = ObserverRegistry::new();
        let log = Arc::new(SnapshotLog::default());
        observers.subscribe(log.clone());
        let dispatcher = Dispatcher::new(
            &DispatcherConfig {
                max_concurrent: 1,
                min_spacing_ms: 0,
            },
            observers,
        );

        dispatcher
            .submit("unit", || async { Ok::<_, ProviderError>(()) }, None)
            .await
            .unwrap();

        let seen = log.0.lock().unwrap().clone();
        let expected = vec![
            QueueSnapshot { queued: 1, running: 0, executing: 0 },
            QueueSnapshot { queued: 0, running: 1, executing: 0 },
            QueueSnapshot { queued: 0, running: 1, executing: 1 },
            QueueSnapshot { queued: 0, running: 0, executing: 0 },
        ];
        assert_eq!(seen, expected);
    }
}
