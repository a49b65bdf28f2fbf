//! `hypercycle history`: list recorded cycles.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::display::{colorize_score, list_table, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, HistoricalRecord};
use crate::domain::ports::HistoryStore;
use crate::infrastructure::storage::JsonFileHistoryStore;

/// Arguments of `hypercycle history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show only the most recent N records
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryListOutput {
    total: usize,
    records: Vec<HistoricalRecord>,
}

fn optional_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.0}%", v * 100.0))
}

impl CommandOutput for HistoryListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&[
            "#", "when", "suggestion", "quality", "coord", "directive", "reuse", "seconds",
        ]);
        let first = self.total - self.records.len() + 1;
        for (i, record) in self.records.iter().enumerate() {
            let metrics = &record.metrics;
            table.add_row(vec![
                (first + i).to_string(),
                record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                truncate(&record.suggestion_text, 40),
                colorize_score(metrics.solution_quality).to_string(),
                colorize_score(metrics.coordinator_performance).to_string(),
                colorize_score(metrics.directive_quality).to_string(),
                optional_pct(metrics.reuse_rate),
                record
                    .cycle_duration_seconds
                    .map_or_else(|| "-".to_string(), |s| format!("{s:.1}")),
            ]);
        }
        render_list("record", &table, self.records.len())
    }
}

/// List recorded cycles.
pub async fn execute(args: HistoryArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = JsonFileHistoryStore::new(&config.storage.history_path);
    let mut records = store
        .read_all()
        .await
        .with_context(|| format!("Failed to read history from {}", store.path().display()))?;

    let total = records.len();
    records.drain(..total.saturating_sub(args.limit));
    crate::cli::display::output(&HistoryListOutput { total, records }, json_mode);
    Ok(())
}
