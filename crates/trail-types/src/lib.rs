//! Shared data model for the trajectory generation engine.
//!
//! Everything that crosses a crate boundary lives here: identifiers,
//! element descriptors with their selector candidates, action specs,
//! oracle decisions, step/episode records and the error taxonomy.

pub mod action;
pub mod element;
pub mod episode;
pub mod errors;
pub mod step;
pub mod tabs;

pub use action::{ActionSpec, CompletionSignal, Decision};
pub use element::{
    BoundingBox, ElementAttributes, ElementDescriptor, SelectorCandidate, SelectorKind,
    StateSummaryEntry,
};
pub use episode::{Episode, EpisodeId, EpisodeStatus, WorkerId};
pub use errors::{AttemptErrorKind, EngineError};
pub use step::{AttemptFailure, ExecutionAttempt, StepOutcome, StepRecord};
pub use tabs::{TabDelta, TabSnapshot};

/// Note attached to a step that only succeeded through a fallback candidate.
pub const NOTE_FALLBACK_SELECTOR: &str = "fallback_selector_used";

/// Note attached to the step whose action opened a new tab.
pub const NOTE_TAB_BRANCH: &str = "tab_branch";
