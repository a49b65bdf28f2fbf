//! Fail-safe thresholds and the report produced when one is crossed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::{EngineError, EngineResult};

/// Operator-tunable halt thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailSafeCriteria {
    /// Minimum artifact growth between consecutive cycles, in percent.
    #[serde(default = "default_min_growth")]
    pub min_artifact_growth_rate_pct: f64,

    /// Largest tolerated drop of a key score, in percent.
    #[serde(default = "default_max_drop")]
    pub max_performance_drop_pct: f64,

    /// Largest tolerated number of unresolved bottlenecks.
    #[serde(default = "default_max_bottlenecks")]
    pub max_bottlenecks: u32,

    /// Minimum share of contributions reusing existing snippets, in percent.
    #[serde(default = "default_min_reuse")]
    pub min_reuse_rate_pct: f64,

    /// Hard ceiling on a continuous cycle, overtime included.
    #[serde(default = "default_max_cycle_duration")]
    pub max_cycle_duration_seconds: f64,
}

const fn default_min_growth() -> f64 {
    5.0
}

const fn default_max_drop() -> f64 {
    20.0
}

const fn default_max_bottlenecks() -> u32 {
    3
}

const fn default_min_reuse() -> f64 {
    10.0
}

const fn default_max_cycle_duration() -> f64 {
    150.0
}

impl Default for FailSafeCriteria {
    fn default() -> Self {
        Self {
            min_artifact_growth_rate_pct: default_min_growth(),
            max_performance_drop_pct: default_max_drop(),
            max_bottlenecks: default_max_bottlenecks(),
            min_reuse_rate_pct: default_min_reuse(),
            max_cycle_duration_seconds: default_max_cycle_duration(),
        }
    }
}

impl FailSafeCriteria {
    /// Reject non-finite or negative thresholds and a zero duration ceiling.
    pub fn validate(&self) -> EngineResult<()> {
        let percentages = [
            ("minArtifactGrowthRatePct", self.min_artifact_growth_rate_pct),
            ("maxPerformanceDropPct", self.max_performance_drop_pct),
            ("minReuseRatePct", self.min_reuse_rate_pct),
        ];
        for (name, value) in percentages {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidCriteria(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if !self.max_cycle_duration_seconds.is_finite() || self.max_cycle_duration_seconds <= 0.0 {
            return Err(EngineError::InvalidCriteria(format!(
                "maxCycleDurationSeconds must be positive, got {}",
                self.max_cycle_duration_seconds
            )));
        }

        Ok(())
    }

    /// Ceiling as milliseconds.
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_cycle_duration_ms(&self) -> i64 {
        (self.max_cycle_duration_seconds * 1000.0) as i64
    }
}

/// Which threshold was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailSafeCriterion {
    /// Workday ran past the duration ceiling.
    MaxCycleDurationExceeded,
    /// Artifact grew too little.
    MinCodeGrowthRate,
    /// A key score dropped too far.
    MaxPerformanceDrop,
    /// Too many unresolved bottlenecks.
    MaxBottlenecks,
    /// Near-identical synthesis for a different goal.
    MissingCodeReuse,
    /// Too few contributions reused snippets.
    LowCodeReuseRate,
}

impl FailSafeCriterion {
    /// camelCase name, as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxCycleDurationExceeded => "maxCycleDurationExceeded",
            Self::MinCodeGrowthRate => "minCodeGrowthRate",
            Self::MaxPerformanceDrop => "maxPerformanceDrop",
            Self::MaxBottlenecks => "maxBottlenecks",
            Self::MissingCodeReuse => "missingCodeReuse",
            Self::LowCodeReuseRate => "lowCodeReuseRate",
        }
    }

    /// Fixed operator guidance for this criterion.
    pub const fn remediation_steps(self) -> [&'static str; 3] {
        match self {
            Self::MaxCycleDurationExceeded => [
                "Review agent logs for performance bottlenecks.",
                "Simplify the suggestion to reduce cycle complexity.",
                "Approve overtime if complexity is necessary.",
            ],
            Self::MinCodeGrowthRate => [
                "Review the coordinator's rewritten prompt for ambition.",
                "Increase complexity of the user suggestion.",
                "Check if the core logic role is being too conservative.",
            ],
            Self::MaxPerformanceDrop => [
                "Analyze the last cycle's team discussion for errors.",
                "Review director guidance for unintended consequences.",
                "Consider a prompt reset for underperforming agents.",
            ],
            Self::MaxBottlenecks => [
                "Review the last QA and coordinator reports.",
                "Ensure the refactoring mandates are being correctly implemented.",
                "Instruct the coordinator to prioritize bottleneck resolution in the next cycle.",
            ],
            Self::MissingCodeReuse => [
                "Agents are not reusing existing patterns.",
                "Review agent prompts to enforce checking for reusable code.",
                "Consider increasing penalty for redundancy in agent evaluations.",
            ],
            Self::LowCodeReuseRate => [
                "Agents are not effectively querying the snippet bank.",
                "Review agent prompts to enforce reuse.",
                "Ensure the snippet bank contains relevant, high-quality snippets.",
            ],
        }
    }
}

impl fmt::Display for FailSafeCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produced when a cycle violates a threshold; puts the engine in `Halted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailSafeReport {
    /// Check that failed.
    pub triggered_criterion: FailSafeCriterion,
    /// What was measured against which threshold.
    pub message: String,
    /// Operator guidance for the criterion.
    pub remediation_steps: Vec<String>,
}

impl FailSafeReport {
    /// Report for `criterion` with its standard remediation steps.
    pub fn new(criterion: FailSafeCriterion, message: impl Into<String>) -> Self {
        Self {
            triggered_criterion: criterion,
            message: message.into(),
            remediation_steps: criterion
                .remediation_steps()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let criteria = FailSafeCriteria::default();
        assert!((criteria.min_artifact_growth_rate_pct - 5.0).abs() < f64::EPSILON);
        assert_eq!(criteria.max_bottlenecks, 3);
        assert_eq!(criteria.max_cycle_duration_ms(), 150_000);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_partial_json_merges_over_defaults() {
        let criteria: FailSafeCriteria =
            serde_json::from_str(r#"{"maxBottlenecks": 7}"#).unwrap();
        assert_eq!(criteria.max_bottlenecks, 7);
        assert!((criteria.max_performance_drop_pct - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let negative = FailSafeCriteria {
            max_performance_drop_pct: -1.0,
            ..FailSafeCriteria::default()
        };
        assert!(matches!(negative.validate(), Err(EngineError::InvalidCriteria(_))));

        let zero_duration = FailSafeCriteria {
            max_cycle_duration_seconds: 0.0,
            ..FailSafeCriteria::default()
        };
        assert!(zero_duration.validate().is_err());

        let nan = FailSafeCriteria {
            min_reuse_rate_pct: f64::NAN,
            ..FailSafeCriteria::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_report_carries_three_steps() {
        let report = FailSafeReport::new(FailSafeCriterion::MaxBottlenecks, "too many");
        assert_eq!(report.remediation_steps.len(), 3);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["triggeredCriterion"], "maxBottlenecks");
    }
}
