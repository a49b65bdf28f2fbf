//! CLI type definitions
//!
//! Clap command structures that define the CLI interface. Per-command
//! argument structs live next to their handlers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::ack::AckArgs;
use super::commands::analyze::AnalyzeArgs;
use super::commands::criteria::CriteriaArgs;
use super::commands::history::HistoryArgs;
use super::commands::run::RunArgs;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "hypercycle")]
#[command(about = "Hypercycle - autonomous multi-agent workday cycles", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file replacing .hypercycle/config.yaml
    #[arg(short, long, global = true, env = "HYPERCYCLE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more workday cycles
    Run(RunArgs),

    /// Show recorded cycles
    History(HistoryArgs),

    /// Show or change fail-safe criteria
    Criteria(CriteriaArgs),

    /// Analyze metric trends and anomalies across the history
    Analyze(AnalyzeArgs),

    /// Acknowledge an outstanding fail-safe halt
    Ack(AckArgs),
}
