//! `hypercycle run`: drive the engine through one or more workdays.

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::display::{action_failure, action_success, colorize_phase, CommandOutput};
use crate::cli::observer::ConsoleObserver;
use crate::cli::output::progress::{create_cycle_spinner, ProgressBarExt};
use crate::domain::models::{Config, CycleOutcome, CyclePhase, FailSafeReport};
use crate::domain::ports::{AgentProvider, HaltStore, HistoryStore};
use crate::infrastructure::openrouter::OpenRouterClient;
use crate::infrastructure::storage::{
    InMemoryHaltStore, InMemoryHistoryStore, JsonFileCriteriaStore, JsonFileHaltStore,
    JsonFileHistoryStore,
};
use crate::infrastructure::MockProvider;
use crate::services::CycleEngine;

/// Arguments of `hypercycle run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Goal for the first workday; later days take the director's next objective
    #[arg(short, long)]
    pub suggestion: String,

    /// File holding the artifact to evolve
    #[arg(short, long)]
    pub artifact: Option<PathBuf>,

    /// Write the evolved artifact here when the run ends
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep running rounds until the deadline or Ctrl-C
    #[arg(long)]
    pub continuous: bool,

    /// Number of consecutive cycles; each starts from the previous artifact
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// Overtime to approve up front, in seconds (continuous mode only)
    #[arg(long, requires = "continuous")]
    pub overtime: Option<u64>,

    /// Use the scripted provider and keep history in memory
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DaySummary {
    day: u32,
    goal: String,
    #[serde(flatten)]
    outcome: CycleOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    days: Vec<DaySummary>,
    artifact_chars: usize,
    artifact: String,
}

impl CommandOutput for RunSummary {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for day in &self.days {
            let outcome = &day.outcome;
            let status = if outcome.cancelled {
                "cancelled".to_string()
            } else {
                colorize_phase(outcome.phase).to_string()
            };
            lines.push(format!(
                "Day {}: {} ({:.1}s)",
                day.day, status, outcome.duration_seconds
            ));
            lines.push(format!("  Goal: {}", day.goal));
            if let Some(directive) = &outcome.directive {
                lines.push(format!("  {} {}", style("Director:").bold(), directive.analysis));
                if !directive.prompt_changes.is_empty() {
                    lines.push(format!(
                        "  {} prompt change(s) proposed",
                        directive.prompt_changes.len()
                    ));
                }
            }
            if let Some(next) = &outcome.next_objective {
                lines.push(format!("  {} {next}", style("Next objective:").bold()));
            }
            if let Some(report) = &outcome.fail_safe {
                lines.push(halt_banner(report));
            }
        }
        lines.push(format!("Artifact: {} chars", self.artifact_chars));
        lines.join("\n")
    }
}

/// Boxed banner shown when the fail-safe halts the engine.
fn halt_banner(report: &FailSafeReport) -> String {
    let title = format!(" FAIL-SAFE HALT: {} ", report.triggered_criterion);
    let mut lines = vec![
        String::new(),
        style(title).white().on_red().bold().to_string(),
        report.message.clone(),
        style("Remediation:").bold().to_string(),
    ];
    lines.extend(
        report
            .remediation_steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("  {}. {step}", i + 1)),
    );
    lines.push(
        style("Run `hypercycle ack` to acknowledge the halt before the next cycle.")
            .dim()
            .to_string(),
    );
    lines.join("\n")
}

/// Run the requested workdays.
pub async fn execute(args: RunArgs, config: &Config, json_mode: bool) -> Result<()> {
    if args.suggestion.trim().is_empty() {
        bail!("--suggestion cannot be empty");
    }
    let mut artifact = match &args.artifact {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read artifact {}", path.display()))?,
        None => String::new(),
    };

    let provider: Arc<dyn AgentProvider> = if args.dry_run {
        Arc::new(MockProvider::new())
    } else {
        Arc::new(OpenRouterClient::new(config.provider.clone())?)
    };
    let (history, halt): (Arc<dyn HistoryStore>, Arc<dyn HaltStore>) = if args.dry_run {
        (
            Arc::new(InMemoryHistoryStore::new()),
            Arc::new(InMemoryHaltStore::new()),
        )
    } else {
        (
            Arc::new(JsonFileHistoryStore::new(&config.storage.history_path)),
            Arc::new(JsonFileHaltStore::new(&config.storage.halt_path)),
        )
    };

    let engine = CycleEngine::builder(provider)
        .with_cycle_config(config.cycle.clone())
        .with_dispatcher_config(config.dispatcher.clone())
        .with_history_store(history)
        .with_halt_store(halt)
        .with_criteria_store(Arc::new(JsonFileCriteriaStore::new(
            &config.storage.criteria_path,
        )))
        .build()
        .await
        .context("Failed to build cycle engine")?;

    if engine.state().phase == CyclePhase::Halted {
        bail!("An earlier fail-safe halt is unacknowledged. Run `hypercycle ack` first");
    }

    let spinner = create_cycle_spinner(json_mode);
    let subscription = engine.subscribe(Arc::new(ConsoleObserver::new(spinner.clone(), json_mode)));
    if !json_mode && args.dry_run {
        spinner.println(style("Dry run: scripted provider, history kept in memory").dim().to_string());
    }

    let mut days = Vec::new();
    let mut goal = args.suggestion.clone();
    for day in 1..=args.days {
        info!(day, continuous = args.continuous, %goal, "starting workday");
        let outcome = if args.continuous {
            run_continuous(&engine, &goal, args.overtime, &artifact).await
        } else {
            engine
                .start_single_cycle(&goal, &artifact)
                .await
                .map_err(anyhow::Error::from)
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                spinner.finish_error(format!("Day {day} failed"));
                engine.unsubscribe(subscription);
                return Err(err.context(format!("Day {day} failed")));
            }
        };

        artifact = engine.artifact();
        let halted = outcome.phase == CyclePhase::Halted;
        let cancelled = outcome.cancelled;
        let next = next_goal(&goal, &outcome);
        days.push(DaySummary {
            day,
            goal: std::mem::replace(&mut goal, next),
            outcome,
        });
        if halted {
            warn!(day, "engine halted by fail-safe, stopping run");
            break;
        }
        if cancelled {
            break;
        }
    }

    engine.unsubscribe(subscription);
    let halted = engine.state().phase == CyclePhase::Halted;
    if halted {
        spinner.finish_warning("Halted by fail-safe");
    } else {
        spinner.finish_success(format!("{} cycle(s) complete", days.len()));
    }

    if let Some(path) = &args.output {
        tokio::fs::write(path, &artifact)
            .await
            .with_context(|| format!("Failed to write artifact {}", path.display()))?;
        if !json_mode {
            println!("{}", action_success(&format!("Artifact written to {}", path.display())));
        }
    }

    let summary = RunSummary {
        days,
        artifact_chars: artifact.chars().count(),
        artifact,
    };
    crate::cli::display::output(&summary, json_mode);
    if halted && !json_mode {
        println!("{}", action_failure("Run stopped by the fail-safe"));
    }
    Ok(())
}

/// Goal for the day after `outcome`: the director's objective, else the same goal again.
fn next_goal(current: &str, outcome: &CycleOutcome) -> String {
    outcome
        .next_objective
        .as_deref()
        .map(str::trim)
        .filter(|next| !next.is_empty())
        .unwrap_or(current)
        .to_string()
}

/// Run one continuous cycle; Ctrl-C moves it straight to synthesis.
async fn run_continuous(
    engine: &CycleEngine,
    goal: &str,
    overtime: Option<u64>,
    artifact: &str,
) -> Result<CycleOutcome> {
    engine.start_continuous_cycle(goal, artifact).await?;
    if let Some(seconds) = overtime {
        engine.approve_overtime(seconds);
    }

    let stopper = {
        let engine = engine.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, synthesizing");
                if let Err(err) = engine.request_stop() {
                    warn!(error = %err, "stop request ignored");
                }
            }
        })
    };
    let outcome = engine.join_continuous().await;
    stopper.abort();
    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FailSafeCriterion;

    #[test]
    fn test_halt_banner_lists_remediation() {
        let report = FailSafeReport::new(FailSafeCriterion::MaxBottlenecks, "Too many bottlenecks.");
        let banner = halt_banner(&report);
        assert!(banner.contains("FAIL-SAFE HALT"));
        assert!(banner.contains("Too many bottlenecks."));
        assert!(banner.contains("  1. "));
        assert!(banner.contains("  3. "));
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = RunSummary {
            days: vec![DaySummary {
                day: 1,
                goal: "add chat".to_string(),
                outcome: CycleOutcome {
                    next_objective: Some("add voice".to_string()),
                    ..CycleOutcome::default()
                },
            }],
            artifact_chars: 3,
            artifact: "abc".to_string(),
        };
        let json = summary.to_json();
        assert_eq!(json["days"][0]["day"], 1);
        assert_eq!(json["days"][0]["phase"], "idle");
        assert_eq!(json["days"][0]["goal"], "add chat");
        assert_eq!(json["days"][0]["nextObjective"], "add voice");
        assert!(json["days"][0].get("directive").is_none());
        assert_eq!(json["artifactChars"], 3);
    }

    #[test]
    fn test_next_goal_follows_the_director() {
        let mut outcome = CycleOutcome::default();
        assert_eq!(next_goal("add chat", &outcome), "add chat");

        outcome.next_objective = Some("   ".to_string());
        assert_eq!(next_goal("add chat", &outcome), "add chat");

        outcome.next_objective = Some(" add voice rooms ".to_string());
        assert_eq!(next_goal("add chat", &outcome), "add voice rooms");
    }
}
