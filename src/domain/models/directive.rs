//! Director output attached to a finished cycle.

use serde::{Deserialize, Serialize};

/// Replacement prompt the director proposes for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptChange {
    /// Role name as the director wrote it.
    pub role: String,
    /// Full replacement system prompt.
    pub new_prompt: String,
}

/// The director's reading of the cycle and the changes it asks for.
///
/// Prompt changes are reported, not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    /// Director reading of the cycle.
    pub analysis: String,
    /// Proposed prompt rewrites, possibly none.
    #[serde(default)]
    pub prompt_changes: Vec<PromptChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_changes_are_optional() {
        let directive: Directive =
            serde_json::from_str(r#"{"analysis": "Reuse is slipping."}"#).unwrap();
        assert_eq!(directive.analysis, "Reuse is slipping.");
        assert!(directive.prompt_changes.is_empty());

        let directive: Directive = serde_json::from_str(
            r#"{"analysis": "a", "promptChanges": [{"role": "QA Engineer", "newPrompt": "Be strict."}]}"#,
        )
        .unwrap();
        assert_eq!(directive.prompt_changes[0].new_prompt, "Be strict.");
    }
}
