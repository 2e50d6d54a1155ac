//! Per-step records: attempts, outcomes and the persisted step shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{ActionSpec, Decision};
use crate::element::SelectorCandidate;
use crate::episode::EpisodeId;
use crate::errors::AttemptErrorKind;

/// Classified failure attached to one execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub kind: AttemptErrorKind,
    pub message: String,
}

/// One try of one selector candidate. Append-only within a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAttempt {
    /// Candidate drawn from the targeted descriptor's own chain.
    pub candidate: SelectorCandidate,
    /// The action that was being realized.
    pub action: ActionSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AttemptFailure>,
    pub succeeded: bool,
}

impl ExecutionAttempt {
    pub fn success(candidate: SelectorCandidate, action: ActionSpec) -> Self {
        Self {
            candidate,
            action,
            error: None,
            succeeded: true,
        }
    }

    pub fn failure(
        candidate: SelectorCandidate,
        action: ActionSpec,
        kind: AttemptErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            candidate,
            action,
            error: Some(AttemptFailure {
                kind,
                message: message.into(),
            }),
            succeeded: false,
        }
    }
}

/// Final outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Failed,
}

/// One finalized step of an episode.
///
/// Created at loop top, finalized exactly once when the outcome is known.
/// On `Failed`, transient artifacts (screenshot, state snapshot) are purged
/// by the store while this record survives in the logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub episode_id: EpisodeId,
    /// Monotonic, 0-based, no gaps within an episode.
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_ref: Option<String>,
    /// The oracle decision that drove this step.
    pub decision: Decision,
    /// Every candidate try, in execution order.
    pub attempts: Vec<ExecutionAttempt>,
    pub outcome: StepOutcome,
    /// Empty, "fallback_selector_used" or "tab_branch".
    #[serde(default)]
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

impl StepRecord {
    /// Candidate that finally worked, if the step succeeded.
    pub fn successful_candidate(&self) -> Option<&SelectorCandidate> {
        self.attempts
            .iter()
            .find(|a| a.succeeded)
            .map(|a| &a.candidate)
    }

    /// Candidates that were tried and failed, in order.
    pub fn failed_candidates(&self) -> Vec<&SelectorCandidate> {
        self.attempts
            .iter()
            .filter(|a| !a.succeeded)
            .map(|a| &a.candidate)
            .collect()
    }
}
