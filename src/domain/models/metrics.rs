//! Per-cycle performance scores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores attached to a completed cycle.
///
/// The three mandatory scores are on a 1-5 scale. Optional scores are only
/// present when the evaluator produced them; rates are fractions in `0..=1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Quality of the delivered solution, 1-5.
    pub solution_quality: f64,
    /// How well the coordinator led, 1-5.
    pub coordinator_performance: f64,
    /// Clarity of the goal and plan, 1-5.
    pub directive_quality: f64,

    /// Adherence to stated architecture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architectural_compliance_score: Option<f64>,
    /// Share of work adding debt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architectural_debt_rate: Option<f64>,
    /// Novelty of the solution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub innovation_score: Option<f64>,
    /// Share of creative input that was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspiration_utilization_rate: Option<f64>,
    /// Share of contributions reusing snippets, measured from the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_rate: Option<f64>,
    /// New layers of capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub innovation_layers_added: Option<f64>,
    /// Notable creative jumps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_leaps_count: Option<f64>,
    /// Unresolved bottlenecks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck_count: Option<u32>,
    /// Share of features with telemetry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry_collection_rate: Option<f64>,
    /// Estimated cost reduction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_reduction_factor: Option<f64>,
}

impl PerformanceMetrics {
    /// All-zero metrics used while an evaluation is pending or after it failed.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Read a metric by name. Mandatory scores are always defined.
    pub fn get(&self, name: MetricName) -> Option<f64> {
        match name {
            MetricName::SolutionQuality => Some(self.solution_quality),
            MetricName::CoordinatorPerformance => Some(self.coordinator_performance),
            MetricName::DirectiveQuality => Some(self.directive_quality),
            MetricName::ArchitecturalComplianceScore => self.architectural_compliance_score,
            MetricName::ArchitecturalDebtRate => self.architectural_debt_rate,
            MetricName::InnovationScore => self.innovation_score,
            MetricName::InnovationLayersAdded => self.innovation_layers_added,
            MetricName::CreativeLeapsCount => self.creative_leaps_count,
        }
    }
}

/// Metrics that trend and anomaly analysis operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricName {
    /// Solution quality.
    SolutionQuality,
    /// Coordinator performance.
    CoordinatorPerformance,
    /// Directive quality.
    DirectiveQuality,
    /// Architectural compliance.
    ArchitecturalComplianceScore,
    /// Architectural debt rate.
    ArchitecturalDebtRate,
    /// Innovation score.
    InnovationScore,
    /// Innovation layers added.
    InnovationLayersAdded,
    /// Creative leaps.
    CreativeLeapsCount,
}

impl MetricName {
    /// Metrics tracked for trends.
    pub const TRENDED: [Self; 8] = [
        Self::SolutionQuality,
        Self::CoordinatorPerformance,
        Self::DirectiveQuality,
        Self::ArchitecturalComplianceScore,
        Self::ArchitecturalDebtRate,
        Self::InnovationScore,
        Self::InnovationLayersAdded,
        Self::CreativeLeapsCount,
    ];

    /// Metrics scanned for negative outliers.
    pub const ANOMALY_SCANNED: [Self; 4] = [
        Self::SolutionQuality,
        Self::CoordinatorPerformance,
        Self::DirectiveQuality,
        Self::ArchitecturalComplianceScore,
    ];

    /// camelCase field name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SolutionQuality => "solutionQuality",
            Self::CoordinatorPerformance => "coordinatorPerformance",
            Self::DirectiveQuality => "directiveQuality",
            Self::ArchitecturalComplianceScore => "architecturalComplianceScore",
            Self::ArchitecturalDebtRate => "architecturalDebtRate",
            Self::InnovationScore => "innovationScore",
            Self::InnovationLayersAdded => "innovationLayersAdded",
            Self::CreativeLeapsCount => "creativeLeapsCount",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
