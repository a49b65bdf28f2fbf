//! Phase, trend and score color mapping for CLI output.
//!
//! `console` disables styling on its own when stdout is not a terminal.

use console::{style, StyledObject};

use crate::domain::models::{CyclePhase, TrendDirection};

/// Phase name colored by severity: halted red, busy yellow, idle green.
pub fn colorize_phase(phase: CyclePhase) -> StyledObject<&'static str> {
    let name = phase.as_str();
    match phase {
        CyclePhase::Halted => style(name).red().bold(),
        CyclePhase::Idle => style(name).green(),
        CyclePhase::SingleRunning | CyclePhase::ContinuousRunning => style(name).yellow(),
        CyclePhase::Synthesizing => style(name).cyan(),
    }
}

/// Trend direction colored by sign.
pub fn colorize_direction(direction: TrendDirection) -> StyledObject<String> {
    let text = format!("{direction:?}").to_lowercase();
    match direction {
        TrendDirection::Upward => style(text).green(),
        TrendDirection::Downward => style(text).red(),
        TrendDirection::Flat => style(text).dim(),
    }
}

/// Score on the 0 to 10 scale, red below 4.
pub fn colorize_score(score: f64) -> StyledObject<String> {
    let text = format!("{score:.1}");
    if score < 4.0 {
        style(text).red()
    } else if score >= 7.0 {
        style(text).green()
    } else {
        style(text)
    }
}

/// Styled label for detail views (bold + dimmed colon).
pub fn label(name: &str) -> String {
    format!("{}{}", style(name).bold(), style(":").dim())
}

/// Section header with underline.
pub fn section_header(title: &str) -> String {
    format!("\n{}", style(title).bold().underlined())
}
