//! Error taxonomy for the trajectory engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-level error taxonomy.
///
/// `ElementNotFound` and `ActionTimeout` are absorbed by the selector
/// fallback chain first; only a fully exhausted chain bubbles them into the
/// step retry budget. A tab branch is a termination trigger, not an error,
/// and deliberately has no variant here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// No candidate could locate the element, or the element went stale.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A single action exceeded its execution timeout.
    #[error("action timed out after {0} ms")]
    ActionTimeout(u64),

    /// The browser page closed or became unreachable. Recoverable once by
    /// recreating the page and re-navigating.
    #[error("page unavailable: {0}")]
    PageUnavailable(String),

    /// The decision oracle could not be reached or answered with an error.
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The oracle returned an empty response. Fatal for the episode.
    #[error("oracle returned no decision")]
    NullDecision,

    /// The step index reached the configured ceiling.
    #[error("maximum step count ({0}) exceeded")]
    MaxStepsExceeded(u32),

    /// Every retry round-trip for one step failed.
    #[error("all {0} retries failed")]
    MaxRetriesExceeded(u32),

    /// Catch-all for driver/protocol failures.
    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// Whether this failure ends only the current episode (the worker
    /// proceeds with its next instruction).
    pub fn is_episode_fatal(&self) -> bool {
        !matches!(self, EngineError::ElementNotFound(_) | EngineError::ActionTimeout(_))
    }
}

/// Serializable classification of a single failed execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptErrorKind {
    /// Selector matched nothing.
    NotFound,
    /// Element exists but rejected the interaction.
    NotInteractable,
    /// Element detached between resolution and dispatch.
    Detached,
    /// The attempt exceeded the per-action timeout.
    Timeout,
    /// Page disappeared mid-attempt.
    PageGone,
    /// Anything the driver could not classify.
    Other,
}

impl AttemptErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttemptErrorKind::NotFound => "not_found",
            AttemptErrorKind::NotInteractable => "not_interactable",
            AttemptErrorKind::Detached => "detached",
            AttemptErrorKind::Timeout => "timeout",
            AttemptErrorKind::PageGone => "page_gone",
            AttemptErrorKind::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_absorbable_errors_are_not_episode_fatal() {
        assert!(!EngineError::ElementNotFound("#missing".into()).is_episode_fatal());
        assert!(!EngineError::ActionTimeout(10_000).is_episode_fatal());
        assert!(EngineError::NullDecision.is_episode_fatal());
        assert!(EngineError::PageUnavailable("closed".into()).is_episode_fatal());
    }

    #[test]
    fn attempt_kind_names() {
        assert_eq!(AttemptErrorKind::NotFound.name(), "not_found");
        assert_eq!(AttemptErrorKind::Timeout.name(), "timeout");
    }
}
