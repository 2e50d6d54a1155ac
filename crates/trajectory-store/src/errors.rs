//! Error types for the provenance store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A second record arrived for an index that is already finalized.
    #[error("step {0} already recorded")]
    DuplicateStep(u32),
}
