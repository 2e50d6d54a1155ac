//! Deterministic oracle used for tests and offline development.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use trail_types::{ActionSpec, CompletionSignal, Decision};

use crate::errors::OracleError;
use crate::provider::DecisionOracle;
use crate::request::OracleRequest;

/// Replays a queue of canned responses and records every request it saw.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<Option<Decision>, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full decision.
    pub fn push_decision(&self, decision: Decision) {
        self.responses.lock().push_back(Ok(Some(decision)));
    }

    /// Queue a plain action decision.
    pub fn push_action(&self, description: impl Into<String>, action: ActionSpec) {
        self.push_decision(Decision {
            description: description.into(),
            thought: String::new(),
            action: Some(action),
            updated_goal: None,
            completion: None,
            tokens_used: Some(100),
        });
    }

    /// Queue a completion signal.
    pub fn push_completion(&self, summary: impl Into<String>) {
        self.push_decision(Decision {
            description: "task complete".to_string(),
            thought: String::new(),
            action: None,
            updated_goal: None,
            completion: Some(CompletionSignal {
                summary: summary.into(),
            }),
            tokens_used: Some(50),
        });
    }

    /// Queue a null response.
    pub fn push_null(&self) {
        self.responses.lock().push_back(Ok(None));
    }

    /// Queue a transport error.
    pub fn push_error(&self, error: OracleError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Requests observed so far, in order.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }

    /// Number of round-trips performed.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, request: &OracleRequest) -> Result<Option<Decision>, OracleError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Unavailable("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_are_replayed_in_order() {
        let oracle = ScriptedOracle::new();
        oracle.push_action("click", ActionSpec::Click { target: 0 });
        oracle.push_null();

        let request = OracleRequest::new("goal", "goal");
        let first = oracle.decide(&request).await.unwrap();
        assert!(first.is_some());

        let second = oracle.decide(&request).await.unwrap();
        assert!(second.is_none());

        // Exhausted script reports unavailability.
        assert!(oracle.decide(&request).await.is_err());
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn recorded_requests_expose_retry_context() {
        let oracle = ScriptedOracle::new();
        oracle.push_completion("done");

        let request = OracleRequest::new("g", "g")
            .with_retry_context(vec!["id:#x".to_string()], "element not found");
        oracle.decide(&request).await.unwrap();

        let seen = oracle.requests();
        assert_eq!(seen[0].failed_candidates, vec!["id:#x".to_string()]);
        assert_eq!(seen[0].error_context.as_deref(), Some("element not found"));
    }
}
