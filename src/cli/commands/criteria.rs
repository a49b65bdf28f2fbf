//! `hypercycle criteria`: inspect and tune the fail-safe thresholds.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::display::{action_success, CommandOutput, DetailView};
use crate::domain::models::{Config, FailSafeCriteria};
use crate::domain::ports::CriteriaStore;
use crate::infrastructure::storage::JsonFileCriteriaStore;

/// Arguments of `hypercycle criteria`.
#[derive(Args, Debug)]
pub struct CriteriaArgs {
    /// Show or set.
    #[command(subcommand)]
    pub command: CriteriaCommand,
}

/// Criteria subcommands.
#[derive(Subcommand, Debug)]
pub enum CriteriaCommand {
    /// Show the criteria in effect
    Show,
    /// Change one or more thresholds; the rest keep their values
    Set(CriteriaUpdate),
}

/// Thresholds to change.
#[derive(Args, Debug, Default)]
pub struct CriteriaUpdate {
    /// Minimum artifact growth between cycles, in percent
    #[arg(long)]
    pub min_growth: Option<f64>,

    /// Largest tolerated score drop, in percent
    #[arg(long)]
    pub max_drop: Option<f64>,

    /// Largest tolerated number of unresolved bottlenecks
    #[arg(long)]
    pub max_bottlenecks: Option<u32>,

    /// Minimum snippet reuse rate, in percent
    #[arg(long)]
    pub min_reuse: Option<f64>,

    /// Hard ceiling on a continuous cycle, in seconds
    #[arg(long)]
    pub max_duration: Option<f64>,
}

impl CriteriaUpdate {
    fn apply(&self, mut criteria: FailSafeCriteria) -> FailSafeCriteria {
        if let Some(v) = self.min_growth {
            criteria.min_artifact_growth_rate_pct = v;
        }
        if let Some(v) = self.max_drop {
            criteria.max_performance_drop_pct = v;
        }
        if let Some(v) = self.max_bottlenecks {
            criteria.max_bottlenecks = v;
        }
        if let Some(v) = self.min_reuse {
            criteria.min_reuse_rate_pct = v;
        }
        if let Some(v) = self.max_duration {
            criteria.max_cycle_duration_seconds = v;
        }
        criteria
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CriteriaOutput {
    #[serde(flatten)]
    criteria: FailSafeCriteria,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    updated: bool,
}

impl CommandOutput for CriteriaOutput {
    fn to_human(&self) -> String {
        let c = &self.criteria;
        let view = DetailView::new("Fail-safe criteria")
            .field("min growth", format!("{}%", c.min_artifact_growth_rate_pct))
            .field("max drop", format!("{}%", c.max_performance_drop_pct))
            .field("max bottlenecks", c.max_bottlenecks)
            .field("min reuse", format!("{}%", c.min_reuse_rate_pct))
            .field("max duration", format!("{}s", c.max_cycle_duration_seconds))
            .render();
        if self.updated {
            format!("{}\n\n{view}", action_success("Criteria saved"))
        } else {
            view
        }
    }
}

/// Show or update the stored criteria.
pub async fn execute(args: CriteriaArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = JsonFileCriteriaStore::new(&config.storage.criteria_path);
    let current = store.load().await.context("Failed to load fail-safe criteria")?;

    let output = match args.command {
        CriteriaCommand::Show => CriteriaOutput {
            criteria: current,
            updated: false,
        },
        CriteriaCommand::Set(update) => {
            let criteria = update.apply(current);
            criteria.validate()?;
            store
                .save(&criteria)
                .await
                .context("Failed to save fail-safe criteria")?;
            CriteriaOutput {
                criteria,
                updated: true,
            }
        }
    };
    crate::cli::display::output(&output, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.storage.criteria_path = dir.path().join("criteria.json");
        config
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let update = CriteriaUpdate {
            max_bottlenecks: Some(7),
            ..CriteriaUpdate::default()
        };
        let criteria = update.apply(FailSafeCriteria::default());
        assert_eq!(criteria.max_bottlenecks, 7);
        assert!((criteria.max_cycle_duration_seconds - 150.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_set_persists_merged_criteria() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let args = CriteriaArgs {
            command: CriteriaCommand::Set(CriteriaUpdate {
                min_reuse: Some(25.0),
                ..CriteriaUpdate::default()
            }),
        };
        execute(args, &config, true).await.unwrap();

        let saved = JsonFileCriteriaStore::new(&config.storage.criteria_path)
            .load()
            .await
            .unwrap();
        assert!((saved.min_reuse_rate_pct - 25.0).abs() < f64::EPSILON);
        assert_eq!(saved.max_bottlenecks, 3);
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let args = CriteriaArgs {
            command: CriteriaCommand::Set(CriteriaUpdate {
                max_duration: Some(0.0),
                ..CriteriaUpdate::default()
            }),
        };
        assert!(execute(args, &config, true).await.is_err());
        assert!(!config.storage.criteria_path.exists());
    }
}
