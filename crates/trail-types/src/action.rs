//! Structured actions and oracle decisions.
//!
//! The oracle never emits executable code. It emits one `ActionSpec` per
//! decision and the executor is the only place selectors are realized.

use serde::{Deserialize, Serialize};

/// One structured action proposed by the oracle.
///
/// Element-targeting variants carry an annotation id, never a selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Click the element with the given annotation id.
    Click { target: u32 },
    /// Fill text into the element with the given annotation id.
    Fill { target: u32, text: String },
    /// Scroll the page by pixel deltas.
    Scroll { dx: i32, dy: i32 },
    /// Wait for a fixed duration.
    Wait { duration_ms: u64 },
    /// Press a keyboard key (e.g. "Enter").
    KeyPress { key: String },
}

impl ActionSpec {
    /// Stable action-kind name used in trajectory records.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ActionSpec::Click { .. } => "click",
            ActionSpec::Fill { .. } => "fill",
            ActionSpec::Scroll { .. } => "scroll",
            ActionSpec::Wait { .. } => "wait",
            ActionSpec::KeyPress { .. } => "key_press",
        }
    }

    /// Annotation id this action targets, if it targets an element.
    pub fn target(&self) -> Option<u32> {
        match self {
            ActionSpec::Click { target } | ActionSpec::Fill { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Completion signal from the oracle, closing the episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSignal {
    /// Oracle's summary of what was accomplished.
    pub summary: String,
}

/// One oracle response, consumed (never produced) by this engine.
///
/// Exactly one action per decision is a hard contract with the oracle; the
/// engine never synthesizes multiple actions from one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Short human-readable description of the proposed action.
    #[serde(default)]
    pub description: String,

    /// Oracle's reasoning for this step.
    #[serde(default)]
    pub thought: String,

    /// The single proposed action; absent when `completion` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionSpec>,

    /// Revised sub-goal carried into subsequent steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_goal: Option<String>,

    /// Present when the oracle judges the instruction satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionSignal>,

    /// Tokens consumed producing this decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

impl Decision {
    /// Whether this decision ends the episode successfully.
    pub fn is_completion(&self) -> bool {
        self.completion.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_spec_round_trip() {
        let action = ActionSpec::Fill {
            target: 7,
            text: "rust crates".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"action\":\"fill\""));
        let back: ActionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn action_target_only_for_element_actions() {
        assert_eq!(ActionSpec::Click { target: 3 }.target(), Some(3));
        assert_eq!(ActionSpec::Scroll { dx: 0, dy: 300 }.target(), None);
        assert_eq!(
            ActionSpec::Wait { duration_ms: 500 }.target(),
            None
        );
    }

    #[test]
    fn completion_decision() {
        let decision = Decision {
            description: "done".to_string(),
            thought: String::new(),
            action: None,
            updated_goal: None,
            completion: Some(CompletionSignal {
                summary: "Booked the flight".to_string(),
            }),
            tokens_used: Some(420),
        };
        assert!(decision.is_completion());
    }
}
