//! End-of-cycle synthesis and evaluation port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ProviderError;
use crate::domain::models::{
    CreativeReview, Directive, HistoricalRecord, PerformanceMetrics, WorkdayLog,
};

/// Inputs for the end-of-cycle report.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Goal of the cycle.
    pub suggestion: String,
    /// Artifact the cycle started from
    pub artifact: String,
    /// Workday log at the end of the last round.
    pub log: WorkdayLog,
}

/// Coordinator report split into its sections, plus the evolved artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisReport {
    /// Report as written.
    pub full_text: String,
    /// Plan the artifact is evolved from.
    pub final_plan: String,
    /// Coordinator observations.
    pub coordinator_findings: String,
    /// Longer-term direction.
    pub evolution_strategy: String,
    /// Required cleanups.
    pub refactoring_mandates: String,
    /// Synthesized code, fences removed
    pub artifact_synthesis: String,
    /// Goal rewritten for a follow-up cycle.
    pub rewritten_prompt: String,
    /// Artifact after applying the final plan.
    pub evolved_artifact: String,
}

/// Scores for a cycle. `parsed` is false when the evaluator's payload was unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Scores, zeroed when unparsed.
    pub metrics: PerformanceMetrics,
    /// Raw evaluator answer.
    pub text: String,
    /// Whether `metrics` came from the answer.
    pub parsed: bool,
}

/// What the director sees of a scored cycle.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveRequest<'a> {
    /// Cycle report.
    pub report: &'a SynthesisReport,
    /// Cycle scores.
    pub evaluation: &'a Evaluation,
    /// Full history, newest last
    pub history: &'a [HistoricalRecord],
}

/// Produces the cycle report, scores it and plans the next workday.
#[async_trait]
pub trait CycleSynthesizer: Send + Sync {
    /// Write the report and evolve the artifact from its final plan.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisReport, ProviderError>;

    /// Scout an outside proposal for the goal and have the catalyst judge it.
    async fn creative_review(&self, suggestion: &str) -> Result<CreativeReview, ProviderError>;

    /// Score the cycle from its report and log.
    async fn evaluate(
        &self,
        report: &SynthesisReport,
        log: &WorkdayLog,
    ) -> Result<Evaluation, ProviderError>;

    /// Director analysis of the scored cycle. `None` when the answer was unreadable.
    async fn directive(
        &self,
        request: &DirectiveRequest<'_>,
    ) -> Result<Option<Directive>, ProviderError>;

    /// A single goal for the next workday.
    async fn next_objective(
        &self,
        request: &DirectiveRequest<'_>,
        directive: Option<&Directive>,
    ) -> Result<String, ProviderError>;
}
