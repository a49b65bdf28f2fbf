//! Agent roles taking part in a workday.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Organizational division a role reports into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    /// Coordination, evaluation and governance roles.
    Oversight,
    /// Roles producing the working artifact.
    CoreOperations,
    /// Interface and experience design.
    DesignExperience,
    /// Exploratory roles feeding new ideas into the cycle.
    CreativeInnovation,
}

/// A participant in the simulated workday.
///
/// The set is closed; per-role behavior is resolved through exhaustive
/// matches rather than lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Opens every round and writes the end-of-cycle report.
    Coordinator,
    /// Implements core behavior.
    CoreLogic,
    /// Works on interface and interaction design.
    InterfaceDesign,
    /// Works on audio and social features.
    AudioSocial,
    /// Reviews and integrates the round's output.
    QualityIntegration,
    /// Rewrites the working artifact from the final plan.
    ArtifactSynthesizer,
    /// Scores the finished cycle.
    Evaluator,
    /// Narrates trends and anomalies across cycles.
    Predictor,
    /// Issues high-level directives.
    Director,
    /// Scouts outside inspiration.
    CreativeScout,
    /// Turns inspiration into concrete proposals.
    CreativeCatalyst,
    /// Author of fail-safe halts in the log.
    FailSafe,
}

/// Roles that take a turn in every round, in turn order.
pub const ROUND_ROLES: [Role; 5] = [
    Role::Coordinator,
    Role::CoreLogic,
    Role::InterfaceDesign,
    Role::AudioSocial,
    Role::QualityIntegration,
];

impl Role {
    /// Human-facing name used in rendered logs.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Coordinator => "Manager AI",
            Self::CoreLogic => "Core Logic Coder",
            Self::InterfaceDesign => "UI/UX Coder",
            Self::AudioSocial => "Audio & Social Coder",
            Self::QualityIntegration => "QA Engineer",
            Self::ArtifactSynthesizer => "Code Synthesizer",
            Self::Evaluator => "Evaluator",
            Self::Predictor => "Predictive Analyst",
            Self::Director => "AI CEO",
            Self::CreativeScout => "Creative Scout",
            Self::CreativeCatalyst => "Creative Catalyst",
            Self::FailSafe => "Fail-Safe System",
        }
    }

    /// Division this role belongs to.
    pub const fn division(self) -> Division {
        match self {
            Self::Coordinator
            | Self::Evaluator
            | Self::Predictor
            | Self::Director
            | Self::FailSafe => Division::Oversight,
            Self::CoreLogic
            | Self::AudioSocial
            | Self::QualityIntegration
            | Self::ArtifactSynthesizer => Division::CoreOperations,
            Self::InterfaceDesign => Division::DesignExperience,
            Self::CreativeScout | Self::CreativeCatalyst => Division::CreativeInnovation,
        }
    }

    /// Whether the role produces work that counts towards reuse accounting.
    pub const fn is_contributor(self) -> bool {
        !matches!(self.division(), Division::Oversight)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_starts_with_coordinator() {
        assert_eq!(ROUND_ROLES[0], Role::Coordinator);
        assert_eq!(ROUND_ROLES[4], Role::QualityIntegration);
    }

    #[test]
    fn test_divisions() {
        assert_eq!(Role::Coordinator.division(), Division::Oversight);
        assert_eq!(Role::InterfaceDesign.division(), Division::DesignExperience);
        assert_eq!(Role::CreativeScout.division(), Division::CreativeInnovation);
        assert!(Role::CoreLogic.is_contributor());
        assert!(!Role::Evaluator.is_contributor());
    }

    #[test]
    fn test_display_uses_human_name() {
        assert_eq!(Role::Coordinator.to_string(), "Manager AI");
        assert_eq!(Role::Director.to_string(), "AI CEO");
    }
}
