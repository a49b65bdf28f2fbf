//! Spinners for cycle progress using indicatif.
//!
//! Rounds run for minutes, so the spinner carries the live phase and queue
//! figures while finished log entries are printed above it.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::domain::models::{CycleState, QueueSnapshot};

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Create a spinner for a running cycle. Hidden when `quiet` is set.
pub fn create_cycle_spinner(quiet: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if quiet {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
        return spinner;
    }
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .expect("Invalid spinner template")
            .tick_chars(SPINNER_CHARS),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// One-line status for the spinner message.
pub fn status_line(state: &CycleState, queue: QueueSnapshot) -> String {
    let mut line = format!("{} | cycle #{}", state.phase, state.cycle_count);
    if let Some(remaining) = state.remaining_ms {
        if remaining >= 0 {
            line.push_str(&format!(" | {}s left", remaining / 1000));
        } else {
            line.push_str(&format!(" | {}s over", remaining.unsigned_abs() / 1000));
        }
    }
    if state.overtime_ms > 0 {
        line.push_str(&format!(" | overtime {}s", state.overtime_ms / 1000));
    }
    if queue.queued + queue.running + queue.executing > 0 {
        line.push_str(&format!(
            " | calls: {} queued, {} executing",
            queue.queued + queue.running,
            queue.executing
        ));
    }
    line
}

/// Extension trait for finishing spinners with a status mark.
pub trait ProgressBarExt {
    /// Finish with a success mark.
    fn finish_success(&self, message: impl Into<String>);

    /// Finish with an error mark.
    fn finish_error(&self, message: impl Into<String>);

    /// Finish with a warning mark.
    fn finish_warning(&self, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✓ {}", message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✗ {}", message.into()));
    }

    fn finish_warning(&self, message: impl Into<String>) {
        self.finish_with_message(format!("! {}", message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CyclePhase;

    #[test]
    fn test_status_line_for_running_cycle() {
        let state = CycleState {
            phase: CyclePhase::ContinuousRunning,
            cycle_count: 2,
            remaining_ms: Some(12_500),
            overtime_ms: 30_000,
            ..CycleState::default()
        };
        let queue = QueueSnapshot { queued: 1, running: 0, executing: 1 };
        assert_eq!(
            status_line(&state, queue),
            "continuous_running | cycle #2 | 12s left | overtime 30s | calls: 1 queued, 1 executing"
        );
    }

    #[test]
    fn test_status_line_past_deadline() {
        let state = CycleState {
            phase: CyclePhase::ContinuousRunning,
            cycle_count: 1,
            remaining_ms: Some(-4_000),
            ..CycleState::default()
        };
        assert_eq!(
            status_line(&state, QueueSnapshot::default()),
            "continuous_running | cycle #1 | 4s over"
        );
    }

    #[test]
    fn test_hidden_spinner() {
        let spinner = create_cycle_spinner(true);
        spinner.finish_success("done");
        assert!(spinner.is_finished());
    }
}
