//! Cycle state machine.
//!
//! Owns the engine lifecycle:
//!
//! ```text
//! Idle --start_single_cycle--> SingleRunning --> Synthesizing --> Idle | Halted
//! Idle --start_continuous_cycle--> ContinuousRunning --stop / deadline--> Synthesizing --> Idle | Halted
//! Halted --acknowledge_halt--> Idle
//! ```
//!
//! A halt is written to the halt store and survives a restart until acknowledged.
//!
//! State lives behind a short-lived lock that is never held across an await.
//! The continuous driver and the deadline watcher run as separate tasks and
//! coordinate through the cycle's cancellation token.

mod builder;
mod continuous;

pub use builder::CycleEngineBuilder;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::domain::errors::{EngineError, EngineResult, ProviderError, StoreError};
use crate::domain::models::{
    CycleConfig, CycleOutcome, CyclePhase, CycleState, Directive, FailSafeCriteria, FailSafeReport,
    HistoricalRecord, LogEntry, QueueSnapshot, Role, WorkdayLog, ROUND_ROLES,
};
use crate::domain::ports::{
    AgentProvider, CriteriaStore, CycleSynthesizer, DirectiveRequest, EngineObserver, HaltStore,
    HistoryStore, SynthesisRequest,
};
use crate::services::dispatcher::Dispatcher;
use crate::services::fail_safe;
use crate::services::observer_registry::{ObserverRegistry, SubscriptionId};
use crate::services::prompts::RoundContext;
use crate::services::tick_scheduler::TickScheduler;

pub(crate) struct EngineState {
    cycle: CycleState,
    started: Option<Instant>,
    /// Elapsed time when the workday left `ContinuousRunning`
    ended_ms: Option<i64>,
    criteria: FailSafeCriteria,
    context: RoundContext,
    log: WorkdayLog,
    report: Option<FailSafeReport>,
    last_error: Option<String>,
    cancel: CancellationToken,
}

impl EngineState {
    pub(crate) fn new(criteria: FailSafeCriteria) -> Self {
        Self {
            cycle: CycleState::default(),
            started: None,
            ended_ms: None,
            criteria,
            context: RoundContext::default(),
            log: WorkdayLog::new(),
            report: None,
            last_error: None,
            cancel: CancellationToken::new(),
        }
    }

    fn begin(&mut self, phase: CyclePhase, ctx: RoundContext) -> CancellationToken {
        self.cycle.phase = phase;
        self.cycle.started_at = Some(Utc::now());
        self.cycle.overtime_ms = 0;
        self.cycle.halted = false;
        self.cycle.remaining_ms = None;
        self.cycle.cycle_count += 1;
        self.started = Some(Instant::now());
        self.ended_ms = None;
        self.context = ctx;
        self.log.clear();
        self.report = None;
        self.last_error = None;
        self.cancel = CancellationToken::new();
        self.cancel.clone()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn elapsed_ms(&self) -> i64 {
        self.started
            .map_or(0, |s| s.elapsed().as_millis() as i64)
    }

    /// Close the continuous workday: stamp its length and move to synthesis.
    fn end_workday(&mut self) {
        self.ended_ms = Some(self.elapsed_ms());
        self.cycle.phase = CyclePhase::Synthesizing;
        self.cancel.cancel();
    }

    /// Recorded workday length in whole seconds.
    #[allow(clippy::cast_precision_loss)]
    fn workday_seconds(&self) -> f64 {
        (self.ended_ms.unwrap_or_else(|| self.elapsed_ms()) as f64 / 1000.0).round()
    }
}

pub(crate) struct Inner {
    config: CycleConfig,
    scheduler: TickScheduler,
    dispatcher: Dispatcher,
    synthesizer: Arc<dyn CycleSynthesizer>,
    history: Arc<dyn HistoryStore>,
    criteria_store: Arc<dyn CriteriaStore>,
    halt_store: Arc<dyn HaltStore>,
    observers: ObserverRegistry,
    state: Mutex<EngineState>,
    driver: tokio::sync::Mutex<Option<JoinHandle<EngineResult<CycleOutcome>>>>,
}

/// Autonomous workday cycle engine. Cheap to clone; clones share one engine.
#[derive(Clone)]
pub struct CycleEngine {
    inner: Arc<Inner>,
}

impl CycleEngine {
    /// Start assembling an engine around `provider`.
    pub fn builder(provider: Arc<dyn AgentProvider>) -> CycleEngineBuilder {
        CycleEngineBuilder::new(provider)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn publish(&self) {
        let snapshot = self.with_state(|s| s.cycle.clone());
        self.inner.observers.cycle_state_changed(&snapshot);
    }

    /// Validate a start request and move into `phase`.
    fn begin(
        &self,
        phase: CyclePhase,
        suggestion: &str,
        artifact: &str,
    ) -> EngineResult<CancellationToken> {
        if suggestion.trim().is_empty() {
            return Err(EngineError::EmptySuggestion);
        }
        let token = self.with_state(|s| {
            if s.cycle.auth_locked {
                return Err(EngineError::AuthLocked);
            }
            if s.cycle.phase != CyclePhase::Idle {
                return Err(EngineError::InvalidTransition {
                    from: s.cycle.phase,
                    to: phase,
                });
            }
            Ok(s.begin(phase, RoundContext::new(suggestion, artifact)))
        })?;
        info!(%phase, "cycle started");
        self.publish();
        Ok(token)
    }

    /// Run one round followed by synthesis. The recorded duration is zero.
    ///
    /// A cancelled round returns to `Idle` without synthesis.
    #[instrument(skip(self, artifact))]
    pub async fn start_single_cycle(
        &self,
        suggestion: &str,
        artifact: &str,
    ) -> EngineResult<CycleOutcome> {
        let token = self.begin(CyclePhase::SingleRunning, suggestion, artifact)?;
        let ctx = self.with_state(|s| s.context.clone());

        let outcome = self
            .inner
            .scheduler
            .run_round(&ROUND_ROLES, &ctx, WorkdayLog::new(), &token)
            .await;
        self.with_state(|s| s.log = outcome.log);

        if let Some(err) = outcome.error {
            return Err(self.fail_cycle(err));
        }
        if outcome.cancelled {
            self.with_state(|s| s.cycle.phase = CyclePhase::Idle);
            info!("single cycle cancelled");
            self.publish();
            return Ok(CycleOutcome::ended_early(CyclePhase::Idle));
        }

        self.with_state(|s| s.cycle.phase = CyclePhase::Synthesizing);
        self.publish();
        self.finish_cycle(false).await
    }

    /// Request cancellation of a running single cycle. Returns false when none is running.
    pub fn cancel_single_cycle(&self) -> bool {
        self.with_state(|s| {
            let running = s.cycle.phase == CyclePhase::SingleRunning;
            if running {
                s.cancel.cancel();
            }
            running
        })
    }

    /// Start rounds on a timer until stopped, halted, failed or out of time.
    #[instrument(skip(self, artifact))]
    pub async fn start_continuous_cycle(&self, suggestion: &str, artifact: &str) -> EngineResult<()> {
        let mut driver = self.inner.driver.lock().await;
        let token = self.begin(CyclePhase::ContinuousRunning, suggestion, artifact)?;

        tokio::spawn(self.clone().watch_deadline(token.clone()));
        *driver = Some(tokio::spawn(self.clone().drive_continuous(token)));
        Ok(())
    }

    /// Move straight to synthesis and wait for the cycle to finish.
    #[instrument(skip(self))]
    pub async fn stop_continuous_cycle(&self) -> EngineResult<CycleOutcome> {
        self.request_stop()?;
        self.join_continuous().await
    }

    /// Ask the running continuous cycle to synthesize without waiting for it.
    ///
    /// Returns false when synthesis was already under way.
    pub fn request_stop(&self) -> EngineResult<bool> {
        let stopped = self.with_state(|s| match s.cycle.phase {
            CyclePhase::ContinuousRunning => {
                s.end_workday();
                Ok(true)
            }
            CyclePhase::Synthesizing => Ok(false),
            from => Err(EngineError::InvalidTransition {
                from,
                to: CyclePhase::Synthesizing,
            }),
        })?;
        if stopped {
            info!("continuous cycle stopped by operator");
            self.publish();
        }
        Ok(stopped)
    }

    /// Wait for the running continuous cycle to end on its own.
    pub async fn join_continuous(&self) -> EngineResult<CycleOutcome> {
        let handle = self.inner.driver.lock().await.take();
        let Some(handle) = handle else {
            return Err(EngineError::NoActiveCycle);
        };
        handle
            .await
            .map_err(|err| EngineError::Driver(err.to_string()))?
    }

    /// Extend the running cycle, capped at the configured maximum overtime.
    ///
    /// Only effective while `ContinuousRunning`. Returns the overtime now in effect.
    pub fn approve_overtime(&self, seconds: u64) -> u64 {
        let max = self.inner.config.max_overtime_ms;
        let (overtime, applied) = self.with_state(|s| {
            if s.cycle.phase != CyclePhase::ContinuousRunning {
                return (s.cycle.overtime_ms, false);
            }
            s.cycle.overtime_ms = s
                .cycle
                .overtime_ms
                .saturating_add(seconds.saturating_mul(1000))
                .min(max);
            (s.cycle.overtime_ms, true)
        });
        if applied {
            info!(seconds, overtime_ms = overtime, "overtime approved");
            self.publish();
        }
        overtime
    }

    /// Leave `Halted` and clear the fail-safe report, including the persisted one.
    pub async fn acknowledge_halt(&self) -> EngineResult<()> {
        let phase = self.with_state(|s| s.cycle.phase);
        if phase != CyclePhase::Halted {
            return Err(EngineError::InvalidTransition {
                from: phase,
                to: CyclePhase::Idle,
            });
        }
        self.inner.halt_store.save(None).await?;
        self.with_state(|s| {
            s.cycle.phase = CyclePhase::Idle;
            s.cycle.halted = false;
            s.report = None;
        });
        info!("halt acknowledged");
        self.publish();
        Ok(())
    }

    /// Validate, persist and apply new fail-safe criteria.
    pub async fn update_fail_safe_criteria(&self, criteria: FailSafeCriteria) -> EngineResult<()> {
        criteria.validate()?;
        self.inner.criteria_store.save(&criteria).await?;
        info!(?criteria, "fail-safe criteria updated");
        self.with_state(|s| s.criteria = criteria);
        Ok(())
    }

    /// Unlock the engine after credentials were fixed.
    pub fn clear_auth_lock(&self) {
        self.with_state(|s| {
            s.cycle.auth_locked = false;
            s.last_error = None;
        });
        self.publish();
    }

    /// Snapshot of the current cycle state.
    pub fn state(&self) -> CycleState {
        self.with_state(|s| s.cycle.clone())
    }

    /// Log as of the most recently completed round.
    pub fn log(&self) -> WorkdayLog {
        self.with_state(|s| s.log.clone())
    }

    /// Report behind the current halt, if any.
    pub fn fail_safe_report(&self) -> Option<FailSafeReport> {
        self.with_state(|s| s.report.clone())
    }

    /// Fail-safe criteria in effect.
    pub fn criteria(&self) -> FailSafeCriteria {
        self.with_state(|s| s.criteria.clone())
    }

    /// Artifact the next cycle will start from.
    pub fn artifact(&self) -> String {
        self.with_state(|s| s.context.artifact.clone())
    }

    /// Most recent failure message, cleared when a cycle starts.
    pub fn last_error(&self) -> Option<String> {
        self.with_state(|s| s.last_error.clone())
    }

    /// Current dispatcher queue depth.
    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.inner.dispatcher.snapshot()
    }

    /// Register an observer for engine events.
    pub fn subscribe(&self, observer: Arc<dyn EngineObserver>) -> SubscriptionId {
        self.inner.observers.subscribe(observer)
    }

    /// Remove an observer. Returns false when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    /// Back to `Idle` after a provider failure. Authentication failures lock the engine.
    fn fail_cycle(&self, err: ProviderError) -> EngineError {
        self.with_state(|s| {
            s.cycle.phase = CyclePhase::Idle;
            s.cycle.remaining_ms = None;
            s.cycle.auth_locked |= err.is_authentication();
            s.last_error = Some(err.to_string());
            s.cancel.cancel();
        });
        error!(error = %err, "cycle failed");
        self.publish();
        EngineError::Provider(err)
    }

    fn fail_store(&self, err: StoreError) -> EngineError {
        self.with_state(|s| {
            s.cycle.phase = CyclePhase::Idle;
            s.cycle.remaining_ms = None;
            s.last_error = Some(err.to_string());
            s.cancel.cancel();
        });
        error!(error = %err, "history update failed");
        self.publish();
        EngineError::Store(err)
    }

    fn append_log(&self, entry: LogEntry) {
        let entry = self.with_state(|s| s.log.push(entry));
        self.inner.observers.log_appended(&entry);
    }

    /// Synthesize, run the creative team, record, evaluate, hear the
    /// director, consult the fail-safe and plan the next workday.
    #[instrument(skip(self))]
    async fn finish_cycle(&self, timed: bool) -> EngineResult<CycleOutcome> {
        let (request, workday_seconds) = self.with_state(|s| {
            let request = SynthesisRequest {
                suggestion: s.context.suggestion.clone(),
                artifact: s.context.artifact.clone(),
                log: s.log.clone(),
            };
            (request, s.workday_seconds())
        });
        let duration_seconds = if timed { workday_seconds } else { 0.0 };

        let synthesizer = &self.inner.synthesizer;
        let report = match synthesizer.synthesize(&request).await {
            Ok(report) => report,
            Err(err) => return Err(self.fail_cycle(err)),
        };

        let review = match synthesizer.creative_review(&request.suggestion).await {
            Ok(review) => review,
            Err(err) => return Err(self.fail_cycle(err)),
        };
        self.append_log(LogEntry::new(Role::CreativeScout, review.proposal.clone()));
        self.append_log(LogEntry::new(
            Role::CreativeCatalyst,
            format!("{}\nVERDICT: {}", review.notes, review.verdict),
        ));

        let mut record = HistoricalRecord::pending(request.suggestion.clone())
            .with_artifact_synthesis(report.artifact_synthesis.clone())
            .with_evolved_artifact(report.evolved_artifact.clone())
            .with_cycle_duration(duration_seconds);
        if let Err(err) = self.inner.history.append(record.clone()).await {
            return Err(self.fail_store(err));
        }

        // Scored on the round log; creative entries do not count towards reuse.
        let evaluation = match synthesizer.evaluate(&report, &request.log).await {
            Ok(evaluation) => evaluation,
            Err(err) => return Err(self.fail_cycle(err)),
        };
        if !evaluation.parsed {
            warn!("evaluation unreadable, keeping zeroed metrics");
        }
        record.metrics = evaluation.metrics.clone();
        record.evaluation_text = evaluation.text.clone();
        if let Err(err) = self.inner.history.update_last(record).await {
            return Err(self.fail_store(err));
        }

        let history = match self.inner.history.read_all().await {
            Ok(history) => history,
            Err(err) => return Err(self.fail_store(err)),
        };
        let director_view = DirectiveRequest {
            report: &report,
            evaluation: &evaluation,
            history: &history,
        };
        let directive = match synthesizer.directive(&director_view).await {
            Ok(directive) => directive,
            Err(err) => return Err(self.fail_cycle(err)),
        };
        if let Some(directive) = &directive {
            info!(
                prompt_changes = directive.prompt_changes.len(),
                "director analysis received"
            );
            self.append_log(LogEntry::new(Role::Director, directive.analysis.clone()));
        }

        let criteria = self.with_state(|s| s.criteria.clone());
        let fail_safe = fail_safe::evaluate(&history, &criteria);
        if let Some(found) = &fail_safe {
            if let Err(err) = self.inner.halt_store.save(Some(found)).await {
                warn!(error = %err, "halt not persisted, it holds for this process only");
            }
        }
        let next_objective = if fail_safe.is_none() {
            self.plan_next_workday(&director_view, directive.as_ref()).await
        } else {
            None
        };

        #[allow(clippy::cast_precision_loss)]
        let base_secs = self.inner.config.base_duration_ms as f64 / 1000.0;
        let (phase, halt_entry) = self.with_state(|s| {
            s.context.artifact = report.evolved_artifact.clone();
            s.cycle.remaining_ms = None;
            if duration_seconds > base_secs {
                s.cycle.overtime_incidents += 1;
            }
            match &fail_safe {
                Some(found) => {
                    s.cycle.phase = CyclePhase::Halted;
                    s.cycle.halted = true;
                    s.report = Some(found.clone());
                    s.cancel.cancel();
                    let entry = s.log.push(LogEntry::new(
                        Role::FailSafe,
                        format!("HALT ({}): {}", found.triggered_criterion, found.message),
                    ));
                    (CyclePhase::Halted, Some(entry))
                }
                None => {
                    s.cycle.phase = CyclePhase::Idle;
                    (CyclePhase::Idle, None)
                }
            }
        });

        if let (Some(found), Some(entry)) = (&fail_safe, halt_entry) {
            warn!(
                criterion = %found.triggered_criterion,
                message = %found.message,
                "fail-safe triggered, engine halted"
            );
            self.inner.observers.log_appended(&entry);
            self.inner.observers.fail_safe_triggered(found);
        } else {
            info!(duration_seconds, "cycle complete");
        }
        self.publish();

        Ok(CycleOutcome {
            phase,
            duration_seconds,
            fail_safe,
            cancelled: false,
            directive,
            next_objective,
        })
    }

    /// Ask the director for the next goal. Failures are logged and leave no goal.
    async fn plan_next_workday(
        &self,
        view: &DirectiveRequest<'_>,
        directive: Option<&Directive>,
    ) -> Option<String> {
        match self.inner.synthesizer.next_objective(view, directive).await {
            Ok(objective) => Some(objective),
            Err(err) => {
                warn!(error = %err, "next objective unavailable");
                self.with_state(|s| {
                    s.cycle.auth_locked |= err.is_authentication();
                    s.last_error = Some(err.to_string());
                });
                None
            }
        }
    }
}
