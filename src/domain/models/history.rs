//! Persisted record of a finished cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::PerformanceMetrics;

/// One completed cycle as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRecord {
    /// When the cycle was recorded.
    pub timestamp: DateTime<Utc>,
    /// Evaluator scores; zeroed until evaluated.
    pub metrics: PerformanceMetrics,
    /// Goal the cycle worked on.
    pub suggestion_text: String,
    /// Raw evaluator answer.
    #[serde(default)]
    pub evaluation_text: String,
    /// Synthesized code section of the coordinator report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_synthesis_text: Option<String>,
    /// Full artifact after the cycle's evolution step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolved_artifact_text: Option<String>,
    /// Workday length in whole seconds; zero for single cycles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_duration_seconds: Option<f64>,
}

impl HistoricalRecord {
    /// A record with zeroed metrics, awaiting evaluation.
    pub fn pending(suggestion_text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            metrics: PerformanceMetrics::zeroed(),
            suggestion_text: suggestion_text.into(),
            evaluation_text: String::new(),
            artifact_synthesis_text: None,
            evolved_artifact_text: None,
            cycle_duration_seconds: None,
        }
    }

    /// Attach the synthesized code section.
    #[must_use]
    pub fn with_artifact_synthesis(mut self, text: impl Into<String>) -> Self {
        self.artifact_synthesis_text = Some(text.into());
        self
    }

    /// Attach the evolved artifact.
    #[must_use]
    pub fn with_evolved_artifact(mut self, text: impl Into<String>) -> Self {
        self.evolved_artifact_text = Some(text.into());
        self
    }

    /// Set the workday length.
    #[must_use]
    pub fn with_cycle_duration(mut self, seconds: f64) -> Self {
        self.cycle_duration_seconds = Some(seconds);
        self
    }

    /// Set the scores.
    #[must_use]
    pub fn with_metrics(mut self, metrics: PerformanceMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Override the record time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
