//! Episode execution: the per-step state machine and the orchestrator
//! that runs instruction ranges across isolated per-account workers.
//!
//! One step flows Capturing → Deciding → Executing → TabCheck → Recording,
//! with a bounded Retrying edge back into Deciding; the orchestrator runs
//! episodes strictly sequentially within a worker while workers run in
//! parallel, each owning exactly one browser session.

pub mod config;
pub mod errors;
pub mod instructions;
pub mod machine;
pub mod orchestrator;
pub mod progress;

pub use config::RunnerConfig;
pub use errors::RunnerError;
pub use instructions::{assign_ranges, load_manifest, Instruction, PersonaGroup, WorkerRange};
pub use machine::StepMachine;
pub use orchestrator::{Orchestrator, SessionFactory, WorkerSpec};
pub use progress::ProgressTracker;
