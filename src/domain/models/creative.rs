//! Creative team output: an outside proposal and the catalyst's verdict on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalyst judgement of a scouted proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Proposal fits the goal.
    Valid,
    /// Also used when the catalyst gave no readable verdict.
    #[default]
    Invalid,
}

impl Verdict {
    /// Lowercase name as written in verdict lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One creative-team pass run after the cycle report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeReview {
    /// Scout's proposal, verbatim.
    pub proposal: String,
    /// Catalyst judgement.
    pub verdict: Verdict,
    /// Catalyst critique with the verdict line removed.
    pub notes: String,
}
