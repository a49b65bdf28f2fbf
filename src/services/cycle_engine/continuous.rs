//! Continuous-mode tasks: the round driver and the deadline watcher.

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::EngineResult;
use crate::domain::models::{CycleOutcome, CyclePhase, WorkdayLog, ROUND_ROLES};

use super::CycleEngine;

impl CycleEngine {
    /// Repeat rounds until the cycle token is cancelled, then synthesize.
    pub(super) async fn drive_continuous(self, token: CancellationToken) -> EngineResult<CycleOutcome> {
        let tick = self.inner.config.tick_interval();
        let mut log = WorkdayLog::new();
        let mut rounds = 0_u32;

        loop {
            let ctx = self.with_state(|s| s.context.clone());
            let outcome = self
                .inner
                .scheduler
                .run_round(&ROUND_ROLES, &ctx, log, &token)
                .await;
            log = outcome.log;
            self.with_state(|s| s.log = log.clone());

            if let Some(err) = outcome.error {
                return Err(self.fail_cycle(err));
            }
            rounds += 1;
            debug!(rounds, entries = log.len(), "round settled");

            tokio::select! {
                biased;
                () = token.cancelled() => break,
                () = tokio::time::sleep(tick) => {}
            }
        }

        let synthesizing = self.with_state(|s| s.cycle.phase == CyclePhase::Synthesizing);
        if !synthesizing {
            // Token cancelled by a failure path that already settled the state.
            warn!("continuous cycle ended without synthesis");
            return Ok(CycleOutcome::ended_early(self.state().phase));
        }

        info!(rounds, "synthesizing continuous cycle");
        self.finish_cycle(true).await
    }

    /// Publish the remaining time every poll and force synthesis once the
    /// hard ceiling is reached.
    pub(super) async fn watch_deadline(self, token: CancellationToken) {
        let base = i64::try_from(self.inner.config.base_duration_ms).unwrap_or(i64::MAX);
        let mut interval = tokio::time::interval(self.inner.config.deadline_poll());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => return,
                _ = interval.tick() => {}
            }

            let forced = self.with_state(|s| {
                if s.cycle.phase != CyclePhase::ContinuousRunning {
                    return None;
                }
                let overtime = i64::try_from(s.cycle.overtime_ms).unwrap_or(i64::MAX);
                let remaining = base.saturating_add(overtime) - s.elapsed_ms();
                s.cycle.remaining_ms = Some(remaining);

                let grace = s.criteria.max_cycle_duration_ms() - base;
                let exhausted = remaining <= -grace;
                if exhausted {
                    s.end_workday();
                }
                Some((remaining, exhausted))
            });

            let Some((remaining, exhausted)) = forced else {
                return;
            };
            self.publish();
            if exhausted {
                info!(remaining_ms = remaining, "cycle deadline reached, forcing synthesis");
                return;
            }
        }
    }
}
