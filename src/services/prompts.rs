//! Default system prompts and request construction per role.

use crate::domain::models::Role;
use crate::domain::ports::AgentRequest;

/// Report section headers the coordinator is asked to produce.
pub mod sections {
    /// Plan the artifact is evolved from.
    pub const FINAL_PLAN: &str = "### FINAL PLAN";
    /// Coordinator observations.
    pub const COORDINATOR_FINDINGS: &str = "### COORDINATOR FINDINGS";
    /// Longer-term direction.
    pub const EVOLUTION_STRATEGY: &str = "### ARCHITECTURAL EVOLUTION STRATEGY";
    /// Required cleanups.
    pub const REFACTORING_MANDATES: &str = "### REFACTORING MANDATES";
    /// Synthesized code.
    pub const ARTIFACT_SYNTHESIS: &str = "### ARTIFACT SYNTHESIS";
    /// Goal rewritten for a follow-up cycle.
    pub const REWRITTEN_PROMPT: &str = "### REWRITTEN PROMPT";

    /// Every section, in report order.
    pub const ALL: [&str; 6] = [
        FINAL_PLAN,
        COORDINATOR_FINDINGS,
        EVOLUTION_STRATEGY,
        REFACTORING_MANDATES,
        ARTIFACT_SYNTHESIS,
        REWRITTEN_PROMPT,
    ];
}

const TURN_RULES: &str = "Keep your response to one or two sentences. \
Before writing new code, check the current artifact for something reusable; \
if you build on an existing snippet, state `REUSING: [snippet-<id>]`.";

/// Temperature used when rewriting the artifact.
pub const ARTIFACT_TEMPERATURE: f32 = 0.5;
/// Temperature of the director's analysis.
pub const DIRECTIVE_TEMPERATURE: f32 = 0.6;
/// Temperature used when proposing the next workday's goal.
pub const OBJECTIVE_TEMPERATURE: f32 = 0.9;

const OBJECTIVE_SYSTEM: &str = "You are the AI CEO. The workday is over. Set one concise, high-level \
objective for the next workday that targets the most critical weakness or the biggest opportunity. \
Answer with the objective only, without reasoning.";

/// What a round works on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundContext {
    /// Goal the team works towards
    pub suggestion: String,
    /// Current artifact text, possibly empty
    pub artifact: String,
}

impl RoundContext {
    /// Context for a goal and the artifact it starts from.
    pub fn new(suggestion: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            suggestion: suggestion.into(),
            artifact: artifact.into(),
        }
    }
}

/// Prompt set used to build provider requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptSet;

impl PromptSet {
    /// Default system prompt for a role.
    pub fn system_prompt(self, role: Role) -> String {
        match role {
            Role::Coordinator => format!(
                "You are the Manager AI coordinating a small development team. \
                 Read the discussion and steer the next step. {TURN_RULES}"
            ),
            Role::CoreLogic => format!(
                "You are the Core Logic Coder. Contribute the next piece of core behavior. {TURN_RULES}"
            ),
            Role::InterfaceDesign => format!(
                "You are the UI/UX Coder. Contribute the next interface improvement. {TURN_RULES}"
            ),
            Role::AudioSocial => format!(
                "You are the Audio & Social Coder. Contribute the next audio or social feature. {TURN_RULES}"
            ),
            Role::QualityIntegration => format!(
                "You are the QA Engineer. Check how today's changes fit together and flag risks. {TURN_RULES}"
            ),
            Role::ArtifactSynthesizer => "You are the Code Synthesizer. Rewrite the current artifact so it \
                 implements the final plan. Answer with the complete updated artifact only."
                .to_string(),
            Role::Evaluator => "You are a meta-architect scoring a finished development cycle. \
                 Answer with a JSON object holding solutionQuality, coordinatorPerformance and \
                 directiveQuality (1-5), and where you can judge them architecturalComplianceScore, \
                 architecturalDebtRate, innovationScore, inspirationUtilizationRate, \
                 innovationLayersAdded, creativeLeapsCount and bottleneckCount."
                .to_string(),
            Role::Predictor => "You are a predictive analyst. Given metric trends and anomalies across \
                 cycles, infer root causes and propose fixes. Answer with a JSON object holding \
                 rootCauseInferences (array of strings), proactiveSuggestions (array of strings) \
                 and summary (string)."
                .to_string(),
            Role::Director => "You are the AI CEO overseeing an autonomous development team. \
                 Review the last cycle's report, scores and recent history, then answer with a JSON \
                 object holding analysis (string) and promptChanges (array of objects with role and \
                 newPrompt, empty when no role needs new instructions)."
                .to_string(),
            Role::CreativeScout => "You are the Creative Scout. Find one outside idea or code pattern \
                 that would move the team's goal forward and propose it as a short code sketch."
                .to_string(),
            Role::CreativeCatalyst => "You are the Creative Catalyst. Critique the scout's proposal for \
                 its architectural value and finish with a line `VERDICT: valid` or `VERDICT: invalid`."
                .to_string(),
            Role::FailSafe => "You report fail-safe halts.".to_string(),
        }
    }

    /// Request for one role's turn in a round.
    pub fn turn_request(self, role: Role, ctx: &RoundContext, transcript: &str) -> AgentRequest {
        let transcript = if transcript.is_empty() {
            "(no messages yet)"
        } else {
            transcript
        };
        let user = format!(
            "GOAL: {}\n\nCURRENT ARTIFACT:\n{}\n\nDISCUSSION SO FAR:\n{transcript}",
            ctx.suggestion,
            artifact_or_placeholder(&ctx.artifact),
        );
        AgentRequest::new(role, self.system_prompt(role), user)
    }

    /// Request for the coordinator's end-of-cycle report.
    pub fn synthesis_request(self, ctx: &RoundContext, transcript: &str) -> AgentRequest {
        let headers = sections::ALL.join("\n");
        let system = format!(
            "You are the Manager AI closing the workday. Write the cycle report using exactly \
             these section headers, in this order:\n{headers}\n\
             Put the best code produced today in a fenced block under {}.",
            sections::ARTIFACT_SYNTHESIS
        );
        let user = format!(
            "GOAL: {}\n\nCURRENT ARTIFACT:\n{}\n\nFULL DISCUSSION:\n{transcript}",
            ctx.suggestion,
            artifact_or_placeholder(&ctx.artifact),
        );
        AgentRequest::new(Role::Coordinator, system, user)
    }

    /// Artifact rewrite from the report's final plan.
    pub fn artifact_request(self, artifact: &str, final_plan: &str) -> AgentRequest {
        let user = format!(
            "CURRENT ARTIFACT:\n{}\n\nFINAL PLAN:\n{final_plan}",
            artifact_or_placeholder(artifact)
        );
        AgentRequest::new(
            Role::ArtifactSynthesizer,
            self.system_prompt(Role::ArtifactSynthesizer),
            user,
        )
        .with_temperature(ARTIFACT_TEMPERATURE)
    }

    /// JSON-mode scoring of a finished cycle.
    pub fn evaluation_request(self, report: &str, transcript: &str) -> AgentRequest {
        let user = format!("CYCLE REPORT:\n{report}\n\nDISCUSSION:\n{transcript}");
        AgentRequest::new(Role::Evaluator, self.system_prompt(Role::Evaluator), user).json()
    }

    /// JSON-mode narrative over trends and anomalies.
    pub fn prediction_request(self, analysis_json: &str) -> AgentRequest {
        AgentRequest::new(
            Role::Predictor,
            self.system_prompt(Role::Predictor),
            format!("ANALYSIS:\n{analysis_json}"),
        )
        .json()
    }

    /// Scout's search for an outside proposal.
    pub fn scout_request(self, suggestion: &str) -> AgentRequest {
        AgentRequest::new(
            Role::CreativeScout,
            self.system_prompt(Role::CreativeScout),
            format!("GOAL: {suggestion}"),
        )
    }

    /// Catalyst critique of the scout's proposal.
    pub fn catalyst_request(self, suggestion: &str, proposal: &str) -> AgentRequest {
        AgentRequest::new(
            Role::CreativeCatalyst,
            self.system_prompt(Role::CreativeCatalyst),
            format!("GOAL: {suggestion}\n\nPROPOSAL:\n{proposal}"),
        )
    }

    /// JSON-mode director analysis of a scored cycle.
    pub fn directive_request(
        self,
        final_plan: &str,
        evaluation_json: &str,
        recent_history_json: &str,
    ) -> AgentRequest {
        let user = format!(
            "FINAL PLAN:\n{final_plan}\n\nEVALUATION:\n{evaluation_json}\n\n\
             RECENT HISTORY:\n{recent_history_json}"
        );
        AgentRequest::new(Role::Director, self.system_prompt(Role::Director), user)
            .with_temperature(DIRECTIVE_TEMPERATURE)
            .json()
    }

    /// Free-text goal for the next workday.
    pub fn objective_request(
        self,
        analysis: &str,
        evaluation_json: &str,
        recent_history_json: &str,
    ) -> AgentRequest {
        let user = format!(
            "DIRECTOR ANALYSIS:\n{analysis}\n\nEVALUATION:\n{evaluation_json}\n\n\
             RECENT HISTORY:\n{recent_history_json}"
        );
        AgentRequest::new(Role::Director, OBJECTIVE_SYSTEM, user)
            .with_temperature(OBJECTIVE_TEMPERATURE)
    }
}

fn artifact_or_placeholder(artifact: &str) -> &str {
    if artifact.trim().is_empty() {
        "(empty)"
    } else {
        artifact
    }
}
