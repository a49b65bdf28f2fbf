//! Cycle lifecycle state and dispatcher telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::directive::Directive;
use super::fail_safe::FailSafeReport;

/// Lifecycle phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Ready for a new cycle.
    #[default]
    Idle,
    /// One round in progress.
    SingleRunning,
    /// Rounds repeating on a timer.
    ContinuousRunning,
    /// Workday over; report and scoring under way.
    Synthesizing,
    /// Stopped by the fail-safe until acknowledged.
    Halted,
}

impl CyclePhase {
    /// Snake-case name, as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SingleRunning => "single_running",
            Self::ContinuousRunning => "continuous_running",
            Self::Synthesizing => "synthesizing",
            Self::Halted => "halted",
        }
    }

    /// Whether a round or synthesis is in progress.
    pub const fn is_busy(self) -> bool {
        matches!(
            self,
            Self::SingleRunning | Self::ContinuousRunning | Self::Synthesizing
        )
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the engine's cycle state, as handed to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleState {
    /// Current phase.
    pub phase: CyclePhase,
    /// Wall-clock start of the current or last cycle.
    pub started_at: Option<DateTime<Utc>>,
    /// Overtime approved for the running cycle.
    pub overtime_ms: u64,
    /// Set while an unacknowledged halt is outstanding.
    pub halted: bool,
    /// Time left before the base duration plus overtime runs out; negative once exceeded.
    pub remaining_ms: Option<i64>,
    /// Cycles started since the engine was built.
    pub cycle_count: u64,
    /// Cycles that ran past the base duration.
    pub overtime_incidents: u64,
    /// Set after an authentication failure.
    pub auth_locked: bool,
}

/// Dispatcher load at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Units waiting for a concurrency slot.
    pub queued: usize,
    /// Units holding a slot, spacing wait included.
    pub running: usize,
    /// Units currently inside their work.
    pub executing: usize,
}

/// Result of one finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    /// Phase the engine settled in.
    pub phase: CyclePhase,
    /// Whole seconds from start until the workday ended; zero for single cycles.
    pub duration_seconds: f64,
    /// Report of the check that halted the engine.
    pub fail_safe: Option<FailSafeReport>,
    /// Round ended early through cancellation; nothing was synthesized.
    pub cancelled: bool,
    /// Director analysis, when readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive: Option<Directive>,
    /// Goal proposed for the next workday. Absent after a halt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_objective: Option<String>,
}

impl CycleOutcome {
    /// Outcome of a cycle that ended before synthesis.
    pub fn ended_early(phase: CyclePhase) -> Self {
        Self {
            phase,
            cancelled: true,
            ..Self::default()
        }
    }

    /// Whether the fail-safe stopped the engine.
    pub const fn halted(&self) -> bool {
        self.fail_safe.is_some()
    }
}
