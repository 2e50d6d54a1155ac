//! Error types for the browser ports.

use thiserror::Error;
use trail_types::AttemptErrorKind;

/// Driver-level failures, classified so the executor can fold them into
/// execution attempts without string matching.
#[derive(Debug, Error, Clone)]
pub enum DriverError {
    /// Selector matched no node.
    #[error("element not found: {0}")]
    NotFound(String),

    /// Element exists but refused the interaction.
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// Element detached between resolution and dispatch.
    #[error("element detached: {0}")]
    Detached(String),

    /// The operation exceeded its deadline.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The page or target is gone.
    #[error("page gone: {0}")]
    PageGone(String),

    /// Browser could not be launched or attached.
    #[error("launch failed: {0}")]
    Launch(String),

    /// Anything else the protocol reported.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    /// Map to the serializable attempt classification.
    pub fn attempt_kind(&self) -> AttemptErrorKind {
        match self {
            DriverError::NotFound(_) => AttemptErrorKind::NotFound,
            DriverError::NotInteractable(_) => AttemptErrorKind::NotInteractable,
            DriverError::Detached(_) => AttemptErrorKind::Detached,
            DriverError::Timeout(_) => AttemptErrorKind::Timeout,
            DriverError::PageGone(_) => AttemptErrorKind::PageGone,
            DriverError::Launch(_) | DriverError::Protocol(_) => AttemptErrorKind::Other,
        }
    }

    /// Whether the page itself is unusable (as opposed to one element).
    pub fn is_page_gone(&self) -> bool {
        matches!(self, DriverError::PageGone(_))
    }
}

/// Classify a raw CDP error message into a [`DriverError`].
///
/// Chromium reports targeting failures as free-form text; the substrings
/// here match what the DevTools protocol actually emits.
pub fn classify_protocol_error(message: impl Into<String>) -> DriverError {
    let message = message.into();
    let lower = message.to_ascii_lowercase();
    if lower.contains("could not find node") || lower.contains("no node found") {
        DriverError::NotFound(message)
    } else if lower.contains("not clickable") || lower.contains("not visible") {
        DriverError::NotInteractable(message)
    } else if lower.contains("detached") {
        DriverError::Detached(message)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        DriverError::Timeout(message)
    } else if lower.contains("target closed")
        || lower.contains("session closed")
        || lower.contains("not attached")
        || lower.contains("browser closed")
    {
        DriverError::PageGone(message)
    } else {
        DriverError::Protocol(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_cdp_phrasings() {
        assert!(matches!(
            classify_protocol_error("Could not find node with given id"),
            DriverError::NotFound(_)
        ));
        assert!(matches!(
            classify_protocol_error("Node is detached from document"),
            DriverError::Detached(_)
        ));
        assert!(matches!(
            classify_protocol_error("Target closed"),
            DriverError::PageGone(_)
        ));
        assert!(matches!(
            classify_protocol_error("something odd"),
            DriverError::Protocol(_)
        ));
    }

    #[test]
    fn attempt_kind_mapping() {
        assert_eq!(
            DriverError::NotFound("x".into()).attempt_kind(),
            AttemptErrorKind::NotFound
        );
        assert_eq!(
            DriverError::Timeout("x".into()).attempt_kind(),
            AttemptErrorKind::Timeout
        );
        assert!(DriverError::PageGone("x".into()).is_page_gone());
    }
}
