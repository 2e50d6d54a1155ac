//! Action execution.
//!
//! Interprets exactly one structured [`trail_types::ActionSpec`] against
//! the current capture's selector chains. The oracle never emits
//! executable code; this crate is the only place candidates are realized
//! against the page. Also home of the tab change monitor that detects
//! session branching after successful actions.

pub mod executor;
pub mod tabs;

pub use executor::{ActionExecutor, ExecutionReport, ExecutorConfig};
pub use tabs::{TabPolicy, TabWatcher};
