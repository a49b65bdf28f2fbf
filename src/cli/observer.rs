//! Engine observer that mirrors cycle activity on the terminal.

use console::style;
use indicatif::ProgressBar;
use std::sync::Mutex;

use crate::domain::models::{CycleState, FailSafeReport, LogEntry, QueueSnapshot};
use crate::domain::ports::EngineObserver;

use super::output::progress::status_line;

/// Prints settled log entries above the spinner and keeps its status current.
pub struct ConsoleObserver {
    spinner: ProgressBar,
    quiet: bool,
    last: Mutex<(CycleState, QueueSnapshot)>,
}

impl ConsoleObserver {
    /// Observer printing above `spinner`; silent in JSON mode.
    pub fn new(spinner: ProgressBar, quiet: bool) -> Self {
        Self {
            spinner,
            quiet,
            last: Mutex::new((CycleState::default(), QueueSnapshot::default())),
        }
    }

    fn refresh(&self, update: impl FnOnce(&mut (CycleState, QueueSnapshot))) {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        update(&mut last);
        self.spinner.set_message(status_line(&last.0, last.1));
    }
}

impl EngineObserver for ConsoleObserver {
    fn on_queue_state_changed(&self, snapshot: QueueSnapshot) {
        self.refresh(|last| last.1 = snapshot);
    }

    fn on_cycle_state_changed(&self, state: &CycleState) {
        self.refresh(|last| last.0 = state.clone());
    }

    fn on_log_appended(&self, entry: &LogEntry) {
        if self.quiet || entry.provisional {
            return;
        }
        self.spinner.println(format!(
            "{} {}\n",
            style(format!("[{}]", entry.role)).cyan().bold(),
            entry.content
        ));
    }

    fn on_fail_safe_triggered(&self, report: &FailSafeReport) {
        if !self.quiet {
            self.spinner.println(format!(
                "{} {}",
                style("fail-safe:").red().bold(),
                report.triggered_criterion
            ));
        }
    }
}
