//! Error types for the perception layer.

use thiserror::Error;

use browser_port::DriverError;

#[derive(Debug, Error, Clone)]
pub enum PerceiverError {
    /// The page closed or became unreachable mid-capture. Surfaced to the
    /// caller instead of returning a partial/empty descriptor set.
    #[error("page unavailable: {0}")]
    PageUnavailable(String),

    /// The collection script failed or returned an unexpected shape.
    #[error("element collection failed: {0}")]
    Collection(String),

    /// Screenshot bytes could not be decoded or re-encoded.
    #[error("image processing failed: {0}")]
    Image(String),
}

impl From<DriverError> for PerceiverError {
    fn from(err: DriverError) -> Self {
        if err.is_page_gone() {
            PerceiverError::PageUnavailable(err.to_string())
        } else {
            PerceiverError::Collection(err.to_string())
        }
    }
}

impl PerceiverError {
    /// Whether the failure is the recoverable-once page loss.
    pub fn is_page_unavailable(&self) -> bool {
        matches!(self, PerceiverError::PageUnavailable(_))
    }
}
