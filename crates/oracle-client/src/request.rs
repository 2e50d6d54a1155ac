//! Request shape sent to the oracle on every decision round-trip.

use serde::{Deserialize, Serialize};

use trail_types::StateSummaryEntry;

/// Compressed record of one prior step, carried as decision context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub index: u32,
    pub description: String,
    /// Stable action-kind name ("click", "fill", ...).
    pub action: String,
}

/// One decision request.
///
/// `failed_candidates` and `error_context` are only populated on retry
/// round-trips, so the oracle can avoid proposing what already failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// The instruction under execution.
    pub goal: String,
    /// The oracle's own latest sub-goal revision.
    pub current_goal: String,
    /// Bounded projection of the current descriptor set.
    pub state_summary: Vec<StateSummaryEntry>,
    /// Prior steps of this episode, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Candidates already tried and failed this step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_candidates: Vec<String>,
    /// Final error message from the previous attempt round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_context: Option<String>,
}

impl OracleRequest {
    pub fn new(goal: impl Into<String>, current_goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            current_goal: current_goal.into(),
            state_summary: Vec::new(),
            history: Vec::new(),
            failed_candidates: Vec::new(),
            error_context: None,
        }
    }

    /// Builder: attach the state summary.
    pub fn with_summary(mut self, summary: Vec<StateSummaryEntry>) -> Self {
        self.state_summary = summary;
        self
    }

    /// Builder: attach prior-step history.
    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Builder: attach retry context.
    pub fn with_retry_context(
        mut self,
        failed_candidates: Vec<String>,
        error_context: impl Into<String>,
    ) -> Self {
        self.failed_candidates = failed_candidates;
        self.error_context = Some(error_context.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_fields_are_omitted_when_empty() {
        let request = OracleRequest::new("book a flight", "book a flight");
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("failed_candidates"));
        assert!(!json.contains("error_context"));

        let retry = request.with_retry_context(vec!["id:#go".to_string()], "not found");
        let json = serde_json::to_string(&retry).unwrap();
        assert!(json.contains("failed_candidates"));
        assert!(json.contains("error_context"));
    }
}
