//! Error types for the oracle client.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum OracleError {
    /// Transport failure or non-success status.
    #[error("oracle unreachable: {0}")]
    Unavailable(String),

    /// The round-trip exceeded its deadline.
    #[error("oracle request timed out after {0} ms")]
    Timeout(u64),

    /// The response parsed but violates the one-action contract or is
    /// otherwise incoherent (unknown action kind, missing target, ...).
    #[error("oracle response violates contract: {0}")]
    Contract(String),

    /// The response body could not be parsed at all.
    #[error("malformed oracle response: {0}")]
    Malformed(String),
}
