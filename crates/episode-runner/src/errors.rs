//! Error types for the runner.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Provenance writes are not optional; a failing store ends the
    /// episode.
    #[error("store error: {0}")]
    Store(#[from] trajectory_store::StoreError),

    /// Session-level browser failure (launch, teardown, page creation).
    #[error("browser error: {0}")]
    Browser(String),

    /// Instruction manifest problems.
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<browser_port::DriverError> for RunnerError {
    fn from(err: browser_port::DriverError) -> Self {
        RunnerError::Browser(err.to_string())
    }
}
