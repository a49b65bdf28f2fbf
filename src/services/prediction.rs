//! Predictive narrative over cycle history.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::domain::models::{
    HistoricalRecord, PredictiveAnalysis, PredictiveNarrative, TrendDirection,
};
use crate::domain::ports::AgentProvider;
use crate::services::dispatcher::Dispatcher;
use crate::services::prompts::PromptSet;
use crate::services::trend_analyzer::{analyze_trends, detect_anomalies};

/// Summary used when nothing is trending down and nothing is anomalous.
pub const STABLE_SUMMARY: &str = "All tracked metrics are stable or improving; no intervention is needed.";

/// Combines trend and anomaly analysis with the predictor role's narrative.
pub struct PredictionService {
    provider: Arc<dyn AgentProvider>,
    dispatcher: Dispatcher,
    prompts: PromptSet,
}

impl PredictionService {
    /// Service asking the predictor through `dispatcher`.
    pub fn new(provider: Arc<dyn AgentProvider>, dispatcher: Dispatcher) -> Self {
        Self {
            provider,
            dispatcher,
            prompts: PromptSet,
        }
    }

    /// Analyze `history`. The narrative is `None` when the predictor fails or
    /// answers with something unreadable; the statistics are still returned.
    #[instrument(skip_all, fields(records = history.len()))]
    pub async fn run(&self, history: &[HistoricalRecord]) -> PredictiveAnalysis {
        if history.len() < 2 {
            return PredictiveAnalysis::default();
        }

        let trends = analyze_trends(history);
        let anomalies = detect_anomalies(history);
        let declining = trends
            .iter()
            .any(|t| t.direction == TrendDirection::Downward);

        if !declining && anomalies.is_empty() {
            info!("metrics stable, skipping predictor call");
            return PredictiveAnalysis {
                trends,
                anomalies,
                narrative: Some(PredictiveNarrative {
                    summary: STABLE_SUMMARY.to_string(),
                    ..PredictiveNarrative::default()
                }),
            };
        }

        let summary = json!({
            "trends": trends,
            "anomalies": anomalies
                .iter()
                .map(|a| json!({
                    "metric": a.metric,
                    "zDeviation": a.z_deviation,
                    "suggestion": a.record.suggestion_text,
                    "timestamp": a.record.timestamp,
                }))
                .collect::<Vec<_>>(),
        });
        let request = self.prompts.prediction_request(&summary.to_string());
        let provider = Arc::clone(&self.provider);

        let narrative = match self
            .dispatcher
            .submit("prediction", || async move { provider.invoke(&request).await }, None)
            .await
        {
            Ok(text) => parse_narrative(&text),
            Err(err) => {
                warn!(error = %err, "predictor call failed");
                None
            }
        };

        PredictiveAnalysis {
            trends,
            anomalies,
            narrative,
        }
    }
}

fn parse_narrative(text: &str) -> Option<PredictiveNarrative> {
    let payload = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    serde_json::from_str(payload)
        .map_err(|err| warn!(error = %err, "predictor answer unreadable"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DispatcherConfig, PerformanceMetrics, Role};
    use crate::domain::errors::ProviderError;
    use crate::infrastructure::mock_provider::MockProvider;
    use crate::services::observer_registry::ObserverRegistry;

    fn service(provider: Arc<MockProvider>) -> PredictionService {
        let dispatcher = Dispatcher::new(
            &DispatcherConfig { max_concurrent: 1, min_spacing_ms: 0 },
            ObserverRegistry::new(),
        );
        PredictionService::new(provider, dispatcher)
    }

    fn history(scores: &[f64]) -> Vec<HistoricalRecord> {
        scores
            .iter()
            .map(|&s| {
                HistoricalRecord::pending("goal").with_metrics(PerformanceMetrics {
                    solution_quality: s,
                    coordinator_performance: 4.0,
                    directive_quality: 4.0,
                    ..PerformanceMetrics::default()
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_stable_history_skips_provider() {
        let provider = Arc::new(MockProvider::new());
        let analysis = service(provider.clone()).run(&history(&[3.0, 3.5, 4.0])).await;

        assert_eq!(analysis.narrative.unwrap().summary, STABLE_SUMMARY);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_declining_history_asks_predictor() {
        let provider = Arc::new(MockProvider::new());
        let analysis = service(provider.clone()).run(&history(&[5.0, 4.0, 3.0])).await;

        assert_eq!(analysis.narrative.unwrap().summary, "Minor regression.");
        assert_eq!(provider.calls_for(Role::Predictor), 1);
    }

    #[tokio::test]
    async fn test_malformed_answer_yields_no_narrative() {
        let provider = Arc::new(MockProvider::new().with_response(Role::Predictor, "not json"));
        let analysis = service(provider).run(&history(&[5.0, 4.0, 3.0])).await;

        assert!(analysis.narrative.is_none());
        assert!(!analysis.trends.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_yields_no_narrative() {
        let provider = Arc::new(
            MockProvider::new().with_failure(Role::Predictor, ProviderError::Transient("down".into())),
        );
        let analysis = service(provider).run(&history(&[5.0, 4.0, 3.0])).await;
        assert!(analysis.narrative.is_none());
    }

    #[tokio::test]
    async fn test_single_record_is_empty() {
        let provider = Arc::new(MockProvider::new());
        let analysis = service(provider).run(&history(&[5.0])).await;
        assert_eq!(analysis, PredictiveAnalysis::default());
    }
}
