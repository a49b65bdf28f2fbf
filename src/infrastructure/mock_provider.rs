//! Scripted provider for tests and dry runs.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::errors::ProviderError;
use crate::domain::models::Role;
use crate::domain::ports::{AgentProvider, AgentRequest, ChunkSink};
use crate::services::prompts::sections;

#[derive(Default)]
struct State {
    scripted: HashMap<Role, VecDeque<Result<String, ProviderError>>>,
    failures: HashMap<Role, ProviderError>,
    calls: Vec<AgentRequest>,
}

/// Provider answering from scripts, with plausible canned output otherwise.
///
/// Canned output keeps dry runs healthy: contributors declare reuse, the
/// artifact grows every cycle and the evaluator returns steady scores.
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<State>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Provider with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the role's next call. Queued responses are used in order.
    #[must_use]
    pub fn with_response(self, role: Role, text: impl Into<String>) -> Self {
        self.push(role, Ok(text.into()));
        self
    }

    /// Queue a one-off failure for the role's next call.
    #[must_use]
    pub fn with_failure(self, role: Role, error: ProviderError) -> Self {
        self.push(role, Err(error));
        self
    }

    /// Fail every call made for the role.
    #[must_use]
    pub fn fail_role(self, role: Role, error: ProviderError) -> Self {
        self.lock().failures.insert(role, error);
        self
    }

    /// Sleep this long before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response after construction.
    pub fn push_response(&self, role: Role, text: impl Into<String>) {
        self.push(role, Ok(text.into()));
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<AgentRequest> {
        self.lock().calls.clone()
    }

    /// Number of requests received for the role.
    pub fn calls_for(&self, role: Role) -> usize {
        self.lock().calls.iter().filter(|c| c.role == role).count()
    }

    fn push(&self, role: Role, response: Result<String, ProviderError>) {
        self.lock().scripted.entry(role).or_default().push_back(response);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, request: &AgentRequest) -> Result<String, ProviderError> {
        let mut state = self.lock();
        state.calls.push(request.clone());
        let call_no = state.calls.len();

        if let Some(err) = state.failures.get(&request.role) {
            return Err(err.clone());
        }
        if let Some(scripted) = state
            .scripted
            .get_mut(&request.role)
            .and_then(VecDeque::pop_front)
        {
            return scripted;
        }
        drop(state);
        Ok(canned_response(request, call_no))
    }
}

fn canned_response(request: &AgentRequest, call_no: usize) -> String {
    match request.role {
        Role::Coordinator if request.system_prompt.contains(sections::FINAL_PLAN) => format!(
            "{}\nShip the requested feature in small steps.\n\n\
             {}\nThe team stayed on task.\n\n\
             {}\nKeep modules small and composable.\n\n\
             {}\nNone today.\n\n\
             {}\n```rust\nfn feature_{call_no}() -> u32 {{ {call_no} }}\n```\n\n\
             {}\nContinue with the same goal, one step further.",
            sections::FINAL_PLAN,
            sections::COORDINATOR_FINDINGS,
            sections::EVOLUTION_STRATEGY,
            sections::REFACTORING_MANDATES,
            sections::ARTIFACT_SYNTHESIS,
            sections::REWRITTEN_PROMPT,
        ),
        Role::ArtifactSynthesizer => {
            let current = request
                .user_prompt
                .split_once("CURRENT ARTIFACT:\n")
                .and_then(|(_, rest)| rest.split_once("\n\nFINAL PLAN:"))
                .map(|(artifact, _)| artifact)
                .filter(|a| *a != "(empty)")
                .unwrap_or_default();
            let padding = "x".repeat((current.chars().count() / 10).max(24));
            format!("{current}\nfn step_{call_no}() {{ /* {padding} */ }}")
        }
        Role::Evaluator => r#"{"solutionQuality": 4, "coordinatorPerformance": 4, "directiveQuality": 4, "bottleneckCount": 0}"#
            .to_string(),
        Role::Predictor => r#"{"rootCauseInferences": ["Scores dipped after a rushed cycle."], "proactiveSuggestions": ["Slow down the next cycle."], "summary": "Minor regression."}"#
            .to_string(),
        Role::CreativeScout => format!(
            "Borrow the relay pattern from chat servers.\n```rust\nfn relay_{call_no}() {{}}\n```"
        ),
        Role::CreativeCatalyst => {
            "Fits the current plan and reuses the event loop.\nVERDICT: valid".to_string()
        }
        Role::Director if request.json_mode => r#"{"analysis": "Steady cycle. Keep reuse high and the plan small.", "promptChanges": []}"#
            .to_string(),
        Role::Director => "Harden the newest feature and extend it one step.".to_string(),
        role if role.is_contributor() => {
            format!("{role} extends the plan. REUSING: [snippet-{call_no}]")
        }
        role => format!("{role} acknowledges the plan."),
    }
}

#[async_trait]
impl AgentProvider for MockProvider {
    async fn invoke(&self, request: &AgentRequest) -> Result<String, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.respond(request)
    }

    async fn invoke_streaming(
        &self,
        request: &AgentRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, ProviderError> {
        let text = self.invoke(request).await?;
        let mut accumulated = String::new();
        for line in text.split_inclusive('\n') {
            accumulated.push_str(line);
            on_chunk(line, &accumulated);
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
