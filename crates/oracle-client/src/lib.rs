//! Decision oracle client.
//!
//! The oracle is a black box that, given current page state and goal,
//! proposes exactly one next action or a completion signal. This crate
//! owns the request/response wire shapes, the [`DecisionOracle`] port, the
//! HTTP implementation and a deterministic scripted oracle for tests and
//! offline development.

pub mod errors;
pub mod provider;
pub mod request;
pub mod scripted;
pub mod wire;

pub use errors::OracleError;
pub use provider::{DecisionOracle, HttpOracle, HttpOracleConfig};
pub use request::{HistoryEntry, OracleRequest};
pub use scripted::ScriptedOracle;
