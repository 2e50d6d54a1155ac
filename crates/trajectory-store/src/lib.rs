//! Per-episode provenance storage.
//!
//! Every episode owns an isolated artifact namespace: an index-keyed
//! trajectory log, an append-only error log, final metadata, raw and
//! annotated screenshots, state snapshots and per-step oracle summaries.
//! Failed steps keep their log entries while their transient artifacts are
//! purged — failures are data, not silent drops.

pub mod errors;
pub mod model;
pub mod naming;
pub mod report;
pub mod store;

pub use errors::StoreError;
pub use model::{
    ActionRecord, AttemptedCandidate, EpisodeMetadata, ErrorLog, ErrorLogEntry, TrajectoryEntry,
};
pub use naming::{episode_name, site_name_from_url};
pub use store::TrajectoryStore;
