//! `hypercycle analyze`: trends, anomalies and the predictor's narrative.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use crate::cli::display::{
    colorize_direction, list_table, section_header, truncate, CommandOutput,
};
use crate::domain::models::{Config, PredictiveAnalysis};
use crate::domain::ports::{AgentProvider, HistoryStore};
use crate::infrastructure::openrouter::OpenRouterClient;
use crate::infrastructure::storage::JsonFileHistoryStore;
use crate::infrastructure::MockProvider;
use crate::services::trend_analyzer::{analyze_trends, detect_anomalies};
use crate::services::{Dispatcher, ObserverRegistry, PredictionService};

/// Arguments of `hypercycle analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Skip the predictor call and report statistics only
    #[arg(long)]
    pub no_narrative: bool,

    /// Use the scripted provider for the narrative
    #[arg(long, conflicts_with = "no_narrative")]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisOutput {
    records: usize,
    #[serde(flatten)]
    analysis: PredictiveAnalysis,
}

impl CommandOutput for AnalysisOutput {
    fn to_human(&self) -> String {
        if self.records < 2 {
            return format!(
                "Not enough history to analyze ({} record(s), need at least 2).",
                self.records
            );
        }

        let mut sections = Vec::new();

        let mut trends = list_table(&["metric", "direction", "slope", "growth"]);
        for trend in &self.analysis.trends {
            trends.add_row(vec![
                trend.metric.to_string(),
                colorize_direction(trend.direction).to_string(),
                format!("{:+.3}", trend.slope),
                format!("{:?}", trend.growth),
            ]);
        }
        sections.push(format!("{}\n{trends}", section_header("Trends")));

        if self.analysis.anomalies.is_empty() {
            sections.push(format!("{}\nNone.", section_header("Anomalies")));
        } else {
            let mut anomalies = list_table(&["metric", "z", "when", "suggestion"]);
            for anomaly in &self.analysis.anomalies {
                anomalies.add_row(vec![
                    anomaly.metric.to_string(),
                    format!("{:.2}", anomaly.z_deviation),
                    anomaly.record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    truncate(&anomaly.record.suggestion_text, 40),
                ]);
            }
            sections.push(format!("{}\n{anomalies}", section_header("Anomalies")));
        }

        if let Some(narrative) = &self.analysis.narrative {
            let mut lines = vec![section_header("Forecast"), narrative.summary.clone()];
            lines.extend(
                narrative
                    .root_cause_inferences
                    .iter()
                    .map(|c| format!("  cause: {c}")),
            );
            lines.extend(
                narrative
                    .proactive_suggestions
                    .iter()
                    .map(|s| format!("  suggest: {s}")),
            );
            sections.push(lines.join("\n"));
        }

        sections.join("\n")
    }
}

/// Analyze the recorded history.
pub async fn execute(args: AnalyzeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = JsonFileHistoryStore::new(&config.storage.history_path);
    let history = store
        .read_all()
        .await
        .with_context(|| format!("Failed to read history from {}", store.path().display()))?;

    let analysis = if args.no_narrative {
        if history.len() < 2 {
            PredictiveAnalysis::default()
        } else {
            PredictiveAnalysis {
                trends: analyze_trends(&history),
                anomalies: detect_anomalies(&history),
                narrative: None,
            }
        }
    } else {
        let provider: Arc<dyn AgentProvider> = if args.dry_run {
            Arc::new(MockProvider::new())
        } else {
            Arc::new(OpenRouterClient::new(config.provider.clone())?)
        };
        let dispatcher = Dispatcher::new(&config.dispatcher, ObserverRegistry::new());
        PredictionService::new(provider, dispatcher).run(&history).await
    };

    crate::cli::display::output(
        &AnalysisOutput {
            records: history.len(),
            analysis,
        },
        json_mode,
    );
    Ok(())
}
