//! Derived trend and anomaly results. Never persisted.

use serde::{Deserialize, Serialize};

use super::history::HistoricalRecord;
use super::metrics::MetricName;

/// Sign of a metric's regression slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Rising faster than the flat threshold.
    Upward,
    /// Falling faster than the flat threshold.
    Downward,
    /// Within the flat threshold.
    Flat,
}

/// Pace of change once a slope is scaled by the observed time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthClass {
    /// Growing by more than half per span.
    Exponential,
    /// Growing slowly.
    Incremental,
    /// Roughly unchanged.
    Stagnant,
    /// Shrinking.
    Declining,
}

/// Fitted trend of one metric over the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Metric the trend describes.
    pub metric: MetricName,
    /// Direction of the slope.
    pub direction: TrendDirection,
    /// Least-squares slope per record.
    pub slope: f64,
    /// Pace class of the slope.
    pub growth: GrowthClass,
}

/// A record whose score lies far from the mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    /// Metric that deviated.
    pub metric: MetricName,
    /// The deviating record.
    pub record: HistoricalRecord,
    /// Distance from the mean in standard deviations.
    pub z_deviation: f64,
}

/// Narrative produced by the predictor role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictiveNarrative {
    /// Likely causes of recent changes.
    #[serde(default)]
    pub root_cause_inferences: Vec<String>,
    /// Suggested next steps.
    #[serde(default)]
    pub proactive_suggestions: Vec<String>,
    /// One-paragraph summary.
    pub summary: String,
}

/// Combined output of a prediction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictiveAnalysis {
    /// One trend per tracked metric.
    pub trends: Vec<Trend>,
    /// Records flagged as outliers.
    pub anomalies: Vec<Anomaly>,
    /// Predictor narrative, absent when skipped or unreadable.
    pub narrative: Option<PredictiveNarrative>,
}
