//! Persisted record shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trail_types::{Episode, StepOutcome, StepRecord};

/// The action as recorded in the trajectory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Stable kind name ("click", "fill", ...), or "none" for steps that
    /// never reached execution.
    pub kind: String,
    /// Annotation id for element-targeting actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    pub description: String,
}

/// One entry of the index-keyed trajectory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_ref: Option<String>,
    pub action: ActionRecord,
    pub outcome: StepOutcome,
    #[serde(default)]
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&StepRecord> for TrajectoryEntry {
    fn from(record: &StepRecord) -> Self {
        let action = match &record.decision.action {
            Some(action) => ActionRecord {
                kind: action.kind_name().to_string(),
                target: action.target(),
                description: record.decision.description.clone(),
            },
            None => ActionRecord {
                kind: "none".to_string(),
                target: None,
                description: record.decision.description.clone(),
            },
        };
        Self {
            screenshot_ref: record.screenshot_ref.clone(),
            state_ref: record.state_ref.clone(),
            action,
            outcome: record.outcome,
            note: record.note.clone(),
            timestamp: record.timestamp,
        }
    }
}

/// One failed (or fallback-recovered) candidate within an error entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptedCandidate {
    pub attempt_number: u32,
    /// Candidate in its describe form ("id:#create", ...).
    pub candidate: String,
    pub error_message: String,
}

/// One append-only error-log entry: a failed decision round, or the
/// post-mortem of a step that only succeeded through a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub step_index: u32,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_goal: Option<String>,
    pub attempted_candidates: Vec<AttemptedCandidate>,
    pub final_error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful_candidate: Option<String>,
}

impl ErrorLogEntry {
    /// Build an entry out of a round's attempts.
    pub fn from_attempts(
        step_index: u32,
        description: impl Into<String>,
        attempts: &[trail_types::ExecutionAttempt],
        final_error_message: impl Into<String>,
    ) -> Self {
        let attempted_candidates = attempts
            .iter()
            .filter(|a| !a.succeeded)
            .enumerate()
            .map(|(i, a)| AttemptedCandidate {
                attempt_number: i as u32 + 1,
                candidate: a.candidate.describe(),
                error_message: a
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default(),
            })
            .collect();
        let successful_candidate = attempts
            .iter()
            .find(|a| a.succeeded)
            .map(|a| a.candidate.describe());

        Self {
            step_index,
            timestamp: Utc::now(),
            description: description.into(),
            thought: None,
            current_goal: None,
            attempted_candidates,
            final_error_message: final_error_message.into(),
            successful_candidate,
        }
    }

    /// Builder: attach oracle context.
    pub fn with_context(
        mut self,
        thought: impl Into<String>,
        current_goal: impl Into<String>,
    ) -> Self {
        self.thought = Some(thought.into());
        self.current_goal = Some(current_goal.into());
        self
    }
}

/// On-disk error log shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorLog {
    pub errors: Vec<ErrorLogEntry>,
}

/// Final per-episode metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub episode: String,
    pub persona: String,
    pub goal: String,
    pub start_url: String,
    pub success: bool,
    pub total_steps: u32,
    pub runtime_seconds: f64,
    pub token_usage: u64,
    pub termination_reason: String,
    /// Descriptions of the successfully recorded steps, in order.
    pub steps: Vec<String>,
}

impl EpisodeMetadata {
    pub fn from_episode(episode: &Episode, steps: Vec<String>) -> Self {
        Self {
            episode: episode.name.clone(),
            persona: episode.persona.clone(),
            goal: episode.original_goal.clone(),
            start_url: episode.start_url.clone(),
            success: episode.is_success(),
            total_steps: episode.step_count,
            runtime_seconds: episode.runtime_seconds,
            token_usage: episode.token_usage,
            termination_reason: episode.status.termination_reason().to_string(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trail_types::{
        ActionSpec, AttemptErrorKind, Decision, EpisodeId, ExecutionAttempt, SelectorCandidate,
    };

    #[test]
    fn trajectory_entry_projects_action_fields() {
        let record = StepRecord {
            episode_id: EpisodeId::new(),
            index: 2,
            screenshot_ref: Some("images/screenshot_003.png".to_string()),
            state_ref: Some("state/state_003.json".to_string()),
            decision: Decision {
                description: "Click the Create button".to_string(),
                thought: String::new(),
                action: Some(ActionSpec::Click { target: 3 }),
                updated_goal: None,
                completion: None,
                tokens_used: None,
            },
            attempts: Vec::new(),
            outcome: StepOutcome::Success,
            note: String::new(),
            timestamp: Utc::now(),
        };

        let entry = TrajectoryEntry::from(&record);
        assert_eq!(entry.action.kind, "click");
        assert_eq!(entry.action.target, Some(3));
        assert_eq!(entry.action.description, "Click the Create button");
    }

    #[test]
    fn error_entry_captures_failures_and_success() {
        let click = ActionSpec::Click { target: 0 };
        let attempts = vec![
            ExecutionAttempt::failure(
                SelectorCandidate::DomId { css: "#a".into() },
                click.clone(),
                AttemptErrorKind::NotFound,
                "no node",
            ),
            ExecutionAttempt::success(SelectorCandidate::Coordinates { x: 1, y: 2 }, click),
        ];

        let entry = ErrorLogEntry::from_attempts(4, "click a", &attempts, "previous attempts failed")
            .with_context("thinking", "goal");
        assert_eq!(entry.step_index, 4);
        assert_eq!(entry.attempted_candidates.len(), 1);
        assert_eq!(entry.attempted_candidates[0].candidate, "id:#a");
        assert_eq!(
            entry.successful_candidate.as_deref(),
            Some("coordinates:1,2")
        );
    }
}
