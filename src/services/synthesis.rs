//! Default end-of-cycle synthesizer backed by the reasoning provider.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument, trace, warn};

use crate::domain::errors::ProviderError;
use crate::domain::models::{
    CreativeReview, Directive, HistoricalRecord, PerformanceMetrics, Verdict, WorkdayLog,
};
use crate::domain::ports::{
    AgentProvider, AgentRequest, CycleSynthesizer, DirectiveRequest, Evaluation, SynthesisReport,
    SynthesisRequest,
};
use crate::services::dispatcher::Dispatcher;
use crate::services::prompts::{sections, PromptSet, RoundContext};

const MISSING_PLAN: &str = "No final plan was produced.";
const MISSING_PROMPT: &str = "No rewritten prompt was produced.";
/// Goal used when the director answers with nothing.
pub const FALLBACK_OBJECTIVE: &str = "Continue to drive exponential growth and innovation.";
/// Records from the end of history shown to the director.
const RECENT_RECORDS: usize = 5;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###[^\n]*$").expect("valid header regex"));
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_+-]*[ \t]*\n([\s\S]*?)```").expect("valid fence regex")
});
static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)```").expect("valid json fence regex"));
static REUSE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"REUSING:\s*\[(snippet-[^\]]+)\]").expect("valid reuse regex")
});
static VERDICT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)VERDICT:\s*(valid|invalid)").expect("valid verdict regex")
});

/// Synthesizes reports, evolves the artifact and scores cycles through the provider.
pub struct ProviderSynthesizer {
    provider: Arc<dyn AgentProvider>,
    dispatcher: Dispatcher,
    prompts: PromptSet,
}

impl ProviderSynthesizer {
    /// Synthesizer sending every call through `dispatcher`.
    pub fn new(provider: Arc<dyn AgentProvider>, dispatcher: Dispatcher) -> Self {
        Self {
            provider,
            dispatcher,
            prompts: PromptSet,
        }
    }

    async fn call(&self, label: &str, request: AgentRequest) -> Result<String, ProviderError> {
        let provider = Arc::clone(&self.provider);
        self.dispatcher
            .submit(label, || async move { provider.invoke(&request).await }, None)
            .await
    }
}

#[async_trait]
impl CycleSynthesizer for ProviderSynthesizer {
    #[instrument(skip_all)]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisReport, ProviderError> {
        let ctx = RoundContext::new(&request.suggestion, &request.artifact);
        let report_request = self.prompts.synthesis_request(&ctx, &request.log.render());

        let provider = Arc::clone(&self.provider);
        let full_text = self
            .dispatcher
            .submit(
                "synthesis report",
                || async move {
                    let progress = |_delta: &str, acc: &str| {
                        trace!(chars = acc.len(), "report streaming");
                    };
                    provider.invoke_streaming(&report_request, &progress).await
                },
                None,
            )
            .await?;

        let mut report = parse_report(&full_text);
        debug!(sections = sections::ALL.len(), "report parsed");

        let evolved = self
            .call(
                "artifact synthesis",
                self.prompts.artifact_request(&request.artifact, &report.final_plan),
            )
            .await?;
        report.evolved_artifact = strip_code_fence(&evolved);
        Ok(report)
    }

    #[instrument(skip_all)]
    async fn evaluate(
        &self,
        report: &SynthesisReport,
        log: &WorkdayLog,
    ) -> Result<Evaluation, ProviderError> {
        let text = self
            .call(
                "evaluation",
                self.prompts.evaluation_request(&report.full_text, &log.render()),
            )
            .await?;
        Ok(parse_evaluation(&text, reuse_rate(log)))
    }

    #[instrument(skip_all)]
    async fn creative_review(&self, suggestion: &str) -> Result<CreativeReview, ProviderError> {
        let proposal = self
            .call("creative scout", self.prompts.scout_request(suggestion))
            .await?;
        let critique = self
            .call(
                "creative catalyst",
                self.prompts.catalyst_request(suggestion, &proposal),
            )
            .await?;
        let review = parse_creative_review(proposal, &critique);
        debug!(verdict = %review.verdict, "creative proposal judged");
        Ok(review)
    }

    #[instrument(skip_all)]
    async fn directive(
        &self,
        request: &DirectiveRequest<'_>,
    ) -> Result<Option<Directive>, ProviderError> {
        let (evaluation, recent) = director_context(request);
        let text = self
            .call(
                "director",
                self.prompts
                    .directive_request(&request.report.final_plan, &evaluation, &recent),
            )
            .await?;
        Ok(parse_directive(&text))
    }

    #[instrument(skip_all)]
    async fn next_objective(
        &self,
        request: &DirectiveRequest<'_>,
        directive: Option<&Directive>,
    ) -> Result<String, ProviderError> {
        let (evaluation, recent) = director_context(request);
        let analysis = directive.map_or("No specific analysis was provided.", |d| d.analysis.as_str());
        let text = self
            .call(
                "next objective",
                self.prompts.objective_request(analysis, &evaluation, &recent),
            )
            .await?;
        let objective = text.trim();
        if objective.is_empty() {
            return Ok(FALLBACK_OBJECTIVE.to_string());
        }
        Ok(objective.to_string())
    }
}

/// Evaluation metrics and the newest history records, as pretty JSON.
fn director_context(request: &DirectiveRequest<'_>) -> (String, String) {
    let recent: &[HistoricalRecord] =
        &request.history[request.history.len().saturating_sub(RECENT_RECORDS)..];
    (
        serde_json::to_string_pretty(&request.evaluation.metrics).unwrap_or_default(),
        serde_json::to_string_pretty(recent).unwrap_or_default(),
    )
}

/// Pair the scout's proposal with the catalyst's verdict. A missing verdict counts as invalid.
pub fn parse_creative_review(proposal: String, critique: &str) -> CreativeReview {
    let verdict = VERDICT_LINE
        .captures(critique)
        .and_then(|c| c.get(1))
        .map_or(Verdict::Invalid, |m| {
            if m.as_str().eq_ignore_ascii_case("valid") {
                Verdict::Valid
            } else {
                Verdict::Invalid
            }
        });
    CreativeReview {
        proposal,
        verdict,
        notes: VERDICT_LINE.replace(critique, "").trim().to_string(),
    }
}

/// Read a director answer. `None` when no usable JSON object is found.
pub fn parse_directive(text: &str) -> Option<Directive> {
    let payload = JSON_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or_else(|| outer_object(text), |m| m.as_str());
    match serde_json::from_str::<Directive>(payload) {
        Ok(directive) => Some(directive),
        Err(err) => {
            warn!(error = %err, "director answer unusable, continuing without a directive");
            None
        }
    }
}

/// Split a coordinator report into its known sections.
pub fn parse_report(text: &str) -> SynthesisReport {
    let section = |header: &str| extract_section(text, header).unwrap_or_default();

    let final_plan = extract_section(text, sections::FINAL_PLAN)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING_PLAN.to_string());
    let rewritten_prompt = extract_section(text, sections::REWRITTEN_PROMPT)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING_PROMPT.to_string());

    SynthesisReport {
        full_text: text.to_string(),
        final_plan,
        coordinator_findings: section(sections::COORDINATOR_FINDINGS),
        evolution_strategy: section(sections::EVOLUTION_STRATEGY),
        refactoring_mandates: section(sections::REFACTORING_MANDATES),
        artifact_synthesis: strip_code_fence(&section(sections::ARTIFACT_SYNTHESIS)),
        rewritten_prompt,
        evolved_artifact: String::new(),
    }
}

/// Text between `header` and the next `###` header, trimmed.
pub fn extract_section(text: &str, header: &str) -> Option<String> {
    let start = HEADER
        .find_iter(text)
        .find(|m| m.as_str().trim_end() == header)?
        .end();
    let rest = &text[start..];
    let end = HEADER.find(rest).map_or(rest.len(), |m| m.start());
    Some(rest[..end].trim().to_string())
}

/// Contents of the first fenced code block, or the trimmed text when there is none.
pub fn strip_code_fence(text: &str) -> String {
    CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or_else(|| text.trim(), |m| m.as_str().trim_end())
        .to_string()
}

/// Share of contributor messages declaring snippet reuse. Zero without contributions.
#[allow(clippy::cast_precision_loss)]
pub fn reuse_rate(log: &WorkdayLog) -> f64 {
    let contributions: Vec<&str> = log
        .entries()
        .iter()
        .filter(|e| !e.provisional && e.role.is_contributor() && !e.content.trim().is_empty())
        .map(|e| e.content.as_str())
        .collect();
    if contributions.is_empty() {
        return 0.0;
    }
    let reusing = contributions
        .iter()
        .filter(|c| REUSE_DECLARATION.is_match(c))
        .count();
    reusing as f64 / contributions.len() as f64
}

/// Read evaluator output. Unusable payloads yield zeroed metrics with `parsed == false`.
pub fn parse_evaluation(text: &str, reuse_rate: f64) -> Evaluation {
    let payload = JSON_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or_else(|| outer_object(text), |m| m.as_str());

    match serde_json::from_str::<PerformanceMetrics>(payload) {
        Ok(mut metrics) => {
            metrics.reuse_rate = Some(reuse_rate);
            Evaluation {
                metrics,
                text: text.to_string(),
                parsed: true,
            }
        }
        Err(err) => {
            warn!(error = %err, "evaluation payload unusable, recording zeroed metrics");
            Evaluation {
                metrics: PerformanceMetrics::zeroed(),
                text: text.to_string(),
                parsed: false,
            }
        }
    }
}

fn outer_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DispatcherConfig, Role};
    use crate::infrastructure::mock_provider::MockProvider;
    use crate::services::observer_registry::ObserverRegistry;

    const REPORT: &str = "### FINAL PLAN\nBuild chat.\n\n### COORDINATOR FINDINGS\nGood.\n\n\
### ARTIFACT SYNTHESIS\n```rust\nfn chat() {}\n```\n\n### REWRITTEN PROMPT\nAdd voice chat.";

    #[test]
    fn test_parse_report_sections() {
        let report = parse_report(REPORT);
        assert_eq!(report.final_plan, "Build chat.");
        assert_eq!(report.coordinator_findings, "Good.");
        assert_eq!(report.artifact_synthesis, "fn chat() {}");
        assert_eq!(report.rewritten_prompt, "Add voice chat.");
        assert!(report.refactoring_mandates.is_empty());
    }

    #[test]
    fn test_parse_report_placeholders() {
        let report = parse_report("just prose");
        assert_eq!(report.final_plan, MISSING_PLAN);
        assert_eq!(report.rewritten_prompt, MISSING_PROMPT);
    }

    #[test]
    fn test_strip_code_fence_without_fence() {
        assert_eq!(strip_code_fence("  plain  "), "plain");
    }

    #[test]
    fn test_reuse_rate_counts_contributors_only() {
        let mut log = WorkdayLog::new();
        log.settle(Role::Coordinator, "REUSING: [snippet-1]");
        log.settle(Role::CoreLogic, "REUSING: [snippet-2] for parsing");
        log.settle(Role::InterfaceDesign, "new layout");
        log.push_provisional(Role::AudioSocial);

        assert!((reuse_rate(&log) - 0.5).abs() < f64::EPSILON);
        assert!(reuse_rate(&WorkdayLog::new()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_evaluation_fenced_json() {
        let text = "Solid cycle.\n```json\n{\"solutionQuality\": 4, \"coordinatorPerformance\": 3, \"directiveQuality\": 5, \"reuseRate\": 0.9}\n```";
        let eval = parse_evaluation(text, 0.25);
        assert!(eval.parsed);
        assert!((eval.metrics.coordinator_performance - 3.0).abs() < f64::EPSILON);
        assert_eq!(eval.metrics.reuse_rate, Some(0.25));
    }

    #[test]
    fn test_parse_evaluation_missing_score_is_malformed() {
        let eval = parse_evaluation(r#"{"solutionQuality": 4}"#, 0.5);
        assert!(!eval.parsed);
        assert_eq!(eval.metrics, PerformanceMetrics::zeroed());
        assert_eq!(eval.text, r#"{"solutionQuality": 4}"#);
    }

    #[test]
    fn test_creative_review_verdicts() {
        let review = parse_creative_review("fn relay() {}".into(), "Solid idea.\nverdict: Valid");
        assert_eq!(review.verdict, Verdict::Valid);
        assert_eq!(review.notes, "Solid idea.");
        assert_eq!(review.proposal, "fn relay() {}");

        let review = parse_creative_review(String::new(), "Not sure.");
        assert_eq!(review.verdict, Verdict::Invalid);
        assert_eq!(review.notes, "Not sure.");
    }

    #[test]
    fn test_parse_directive() {
        let fenced = "Here you go\n```json\n{\"analysis\": \"Reuse slipped.\", \"promptChanges\": []}\n```";
        assert_eq!(parse_directive(fenced).unwrap().analysis, "Reuse slipped.");
        assert!(parse_directive("no json here").is_none());
        assert!(parse_directive(r#"{"promptChanges": []}"#).is_none());
    }

    fn unspaced_synthesizer(provider: Arc<MockProvider>) -> ProviderSynthesizer {
        let dispatcher = Dispatcher::new(
            &DispatcherConfig { max_concurrent: 1, min_spacing_ms: 0 },
            ObserverRegistry::new(),
        );
        ProviderSynthesizer::new(provider, dispatcher)
    }

    #[tokio::test]
    async fn test_director_sees_recent_history_only() {
        let provider = Arc::new(
            MockProvider::new()
                .with_response(Role::Director, r#"{"analysis": "Push reuse."}"#)
                .with_response(Role::Director, "  "),
        );
        let synthesizer = unspaced_synthesizer(provider.clone());
        let history: Vec<HistoricalRecord> = (0..8)
            .map(|i| HistoricalRecord::pending(format!("goal {i}")))
            .collect();
        let report = SynthesisReport::default();
        let evaluation = parse_evaluation("", 0.0);
        let request = DirectiveRequest {
            report: &report,
            evaluation: &evaluation,
            history: &history,
        };

        let directive = synthesizer.directive(&request).await.unwrap().unwrap();
        assert_eq!(directive.analysis, "Push reuse.");
        let objective = synthesizer
            .next_objective(&request, Some(&directive))
            .await
            .unwrap();
        assert_eq!(objective, FALLBACK_OBJECTIVE);

        let calls = provider.calls();
        assert!(calls[0].json_mode);
        assert!(!calls[0].user_prompt.contains("goal 2"));
        assert!(calls[0].user_prompt.contains("goal 3"));
        assert!(calls[1].user_prompt.contains("Push reuse."));
    }

    #[tokio::test]
    async fn test_synthesize_evolves_artifact() {
        let provider = Arc::new(
            MockProvider::new()
                .with_response(Role::Coordinator, REPORT)
                .with_response(Role::ArtifactSynthesizer, "```rust\nfn chat() {}\nfn voice() {}\n```"),
        );
        let dispatcher = Dispatcher::new(
            &DispatcherConfig { max_concurrent: 1, min_spacing_ms: 0 },
            ObserverRegistry::new(),
        );
        let synthesizer = ProviderSynthesizer::new(provider.clone(), dispatcher);

        let report = synthesizer
            .synthesize(&SynthesisRequest {
                suggestion: "chat".into(),
                artifact: "fn chat() {}".into(),
                log: WorkdayLog::new(),
            })
            .await
            .unwrap();

        assert_eq!(report.evolved_artifact, "fn chat() {}\nfn voice() {}");
        let calls = provider.calls();
        assert_eq!(calls[1].temperature, Some(0.5));
        assert!(calls[1].user_prompt.contains("Build chat."));
    }
}
