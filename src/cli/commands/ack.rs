//! `hypercycle ack`: acknowledge an outstanding fail-safe halt.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use crate::cli::display::{action_success, CommandOutput, DetailView};
use crate::domain::models::{Config, CyclePhase, FailSafeReport};
use crate::infrastructure::storage::{JsonFileCriteriaStore, JsonFileHaltStore};
use crate::infrastructure::MockProvider;
use crate::services::CycleEngine;

/// Arguments of `hypercycle ack`.
#[derive(Args, Debug, Default)]
pub struct AckArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AckOutput {
    acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<FailSafeReport>,
}

impl CommandOutput for AckOutput {
    fn to_human(&self) -> String {
        let Some(report) = &self.report else {
            return "No outstanding halt.".to_string();
        };
        let view = DetailView::new("Acknowledged halt")
            .field("criterion", &report.triggered_criterion)
            .field("message", &report.message)
            .render();
        format!("{}\n\n{view}", action_success("Engine released, cycles may start again"))
    }
}

/// Acknowledge the stored halt, if any.
pub async fn execute(_args: AckArgs, config: &Config, json_mode: bool) -> Result<()> {
    // Acknowledging never reaches the provider.
    let engine = CycleEngine::builder(Arc::new(MockProvider::new()))
        .with_criteria_store(Arc::new(JsonFileCriteriaStore::new(
            &config.storage.criteria_path,
        )))
        .with_halt_store(Arc::new(JsonFileHaltStore::new(&config.storage.halt_path)))
        .build()
        .await
        .context("Failed to load engine state")?;

    let output = if engine.state().phase == CyclePhase::Halted {
        let report = engine.fail_safe_report();
        engine
            .acknowledge_halt()
            .await
            .context("Failed to acknowledge halt")?;
        AckOutput {
            acknowledged: true,
            report,
        }
    } else {
        AckOutput {
            acknowledged: false,
            report: None,
        }
    };
    crate::cli::display::output(&output, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FailSafeCriterion;
    use crate::domain::ports::HaltStore;

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.storage.criteria_path = dir.path().join("criteria.json");
        config.storage.halt_path = dir.path().join("halt.json");
        config
    }

    #[tokio::test]
    async fn test_ack_clears_persisted_halt() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let store = JsonFileHaltStore::new(&config.storage.halt_path);
        let report = FailSafeReport::new(FailSafeCriterion::LowCodeReuseRate, "Reuse collapsed.");
        store.save(Some(&report)).await.unwrap();

        execute(AckArgs::default(), &config, true).await.unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert!(!config.storage.halt_path.exists());
    }

    #[tokio::test]
    async fn test_ack_without_halt_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        execute(AckArgs::default(), &config, true).await.unwrap();
        assert!(!config.storage.halt_path.exists());
    }

    #[test]
    fn test_human_output_names_the_criterion() {
        let output = AckOutput {
            acknowledged: true,
            report: Some(FailSafeReport::new(FailSafeCriterion::MaxBottlenecks, "Stuck.")),
        };
        let text = output.to_human();
        assert!(text.contains("Stuck."));
        assert_eq!(
            AckOutput { acknowledged: false, report: None }.to_human(),
            "No outstanding halt."
        );
    }
}
