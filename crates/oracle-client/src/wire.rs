//! Wire shape of oracle responses and conversion into [`Decision`].
//!
//! The oracle emits structured fields, never executable code; the
//! conversion here is the single place the one-action contract is
//! enforced.

use serde::{Deserialize, Serialize};

use trail_types::{ActionSpec, CompletionSignal, Decision};

use crate::errors::OracleError;

/// Raw response fields as the oracle sends them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WireDecision {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thought: String,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub selected_annotation_id: Option<u32>,
    #[serde(default)]
    pub text_to_fill: Option<String>,
    #[serde(default)]
    pub scroll_dx: Option<i32>,
    #[serde(default)]
    pub scroll_dy: Option<i32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub updated_goal: Option<String>,
    #[serde(default)]
    pub completion_signal: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
}

impl WireDecision {
    /// Convert into the engine-facing decision, enforcing the contract.
    pub fn into_decision(self) -> Result<Decision, OracleError> {
        let completion = self
            .completion_signal
            .map(|summary| CompletionSignal { summary });

        let action = match (&completion, self.action_type.as_deref()) {
            // A completion response carries no action.
            (Some(_), _) => None,
            (None, None) => {
                return Err(OracleError::Contract(
                    "response carries neither an action nor a completion signal".to_string(),
                ))
            }
            (None, Some(kind)) => Some(parse_action(
                kind,
                self.selected_annotation_id,
                self.text_to_fill,
                self.scroll_dx,
                self.scroll_dy,
                self.duration_ms,
                self.key,
            )?),
        };

        Ok(Decision {
            description: self.description,
            thought: self.thought,
            action,
            updated_goal: self.updated_goal,
            completion,
            tokens_used: self.tokens_used,
        })
    }
}

fn parse_action(
    kind: &str,
    target: Option<u32>,
    text: Option<String>,
    dx: Option<i32>,
    dy: Option<i32>,
    duration_ms: Option<u64>,
    key: Option<String>,
) -> Result<ActionSpec, OracleError> {
    let need_target = |target: Option<u32>| {
        target.ok_or_else(|| {
            OracleError::Contract(format!("{kind} action without selected_annotation_id"))
        })
    };

    match kind {
        "click" => Ok(ActionSpec::Click {
            target: need_target(target)?,
        }),
        "fill" => Ok(ActionSpec::Fill {
            target: need_target(target)?,
            text: text.ok_or_else(|| {
                OracleError::Contract("fill action without text_to_fill".to_string())
            })?,
        }),
        "scroll" => Ok(ActionSpec::Scroll {
            dx: dx.unwrap_or(0),
            dy: dy.unwrap_or(0),
        }),
        "wait" => Ok(ActionSpec::Wait {
            duration_ms: duration_ms.unwrap_or(1_000),
        }),
        "key_press" => Ok(ActionSpec::KeyPress {
            key: key
                .ok_or_else(|| OracleError::Contract("key_press action without key".to_string()))?,
        }),
        other => Err(OracleError::Contract(format!(
            "unknown action type '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_response_converts() {
        let wire: WireDecision = serde_json::from_value(serde_json::json!({
            "description": "Click the Create button",
            "thought": "The form is ready.",
            "action_type": "click",
            "selected_annotation_id": 3,
            "tokens_used": 512
        }))
        .unwrap();

        let decision = wire.into_decision().unwrap();
        assert_eq!(decision.action, Some(ActionSpec::Click { target: 3 }));
        assert_eq!(decision.tokens_used, Some(512));
        assert!(!decision.is_completion());
    }

    #[test]
    fn completion_response_converts_without_action() {
        let wire: WireDecision = serde_json::from_value(serde_json::json!({
            "description": "Done",
            "completion_signal": "Created the event"
        }))
        .unwrap();

        let decision = wire.into_decision().unwrap();
        assert!(decision.is_completion());
        assert!(decision.action.is_none());
    }

    #[test]
    fn missing_target_violates_contract() {
        let wire: WireDecision = serde_json::from_value(serde_json::json!({
            "action_type": "click"
        }))
        .unwrap();
        assert!(matches!(
            wire.into_decision(),
            Err(OracleError::Contract(_))
        ));
    }

    #[test]
    fn empty_response_violates_contract() {
        let wire = WireDecision::default();
        assert!(matches!(
            wire.into_decision(),
            Err(OracleError::Contract(_))
        ));
    }

    #[test]
    fn fill_requires_text() {
        let wire: WireDecision = serde_json::from_value(serde_json::json!({
            "action_type": "fill",
            "selected_annotation_id": 1
        }))
        .unwrap();
        assert!(wire.into_decision().is_err());
    }
}
