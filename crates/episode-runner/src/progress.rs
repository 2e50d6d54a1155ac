//! Cross-worker progress tracking.
//!
//! One logical slot per worker; every write goes through the shared mutex
//! and is flushed to `progress_tracking.json` so an operator can watch a
//! long run from outside the process. Workers never mutate each other's
//! slots.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use trail_types::WorkerId;

use crate::errors::RunnerError;
use crate::instructions::WorkerRange;

const PROGRESS_FILE: &str = "progress_tracking.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InProgressInstruction {
    pub instruction_index: usize,
    pub goal: String,
    pub episode_name: String,
    pub current_step: u32,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedInstruction {
    pub instruction_index: usize,
    pub goal: String,
    pub episode_name: String,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerSlot {
    pub start_idx: usize,
    pub end_idx: usize,
    pub completed: Vec<FinishedInstruction>,
    pub failed: Vec<FinishedInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_progress: Option<InProgressInstruction>,
}

impl WorkerSlot {
    pub fn assigned(&self) -> usize {
        self.end_idx.saturating_sub(self.start_idx)
    }

    pub fn completion_percentage(&self) -> f64 {
        let assigned = self.assigned();
        if assigned == 0 {
            return 0.0;
        }
        self.completed.len() as f64 / assigned as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressFile {
    pub run_id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub total_instructions: usize,
    pub workers: BTreeMap<String, WorkerSlot>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ProgressFile {
    pub fn total_completed(&self) -> usize {
        self.workers.values().map(|w| w.completed.len()).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.workers.values().map(|w| w.failed.len()).sum()
    }
}

/// Shared, write-through progress tracker.
pub struct ProgressTracker {
    path: PathBuf,
    state: Mutex<ProgressFile>,
}

impl ProgressTracker {
    pub fn new(results_dir: &Path) -> Result<Self, RunnerError> {
        std::fs::create_dir_all(results_dir)?;
        let tracker = Self {
            path: results_dir.join(PROGRESS_FILE),
            state: Mutex::new(ProgressFile {
                run_id: Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
                start_time: Some(Utc::now()),
                ..Default::default()
            }),
        };
        tracker.flush(&tracker.state.lock());
        Ok(tracker)
    }

    /// Register every worker's slot up front.
    pub fn setup_workers(&self, workers: &[(WorkerId, WorkerRange)], total: usize) {
        let mut state = self.state.lock();
        state.total_instructions = total;
        for (id, range) in workers {
            state.workers.insert(
                id.to_string(),
                WorkerSlot {
                    start_idx: range.start,
                    end_idx: range.end,
                    ..Default::default()
                },
            );
        }
        state.last_updated = Some(Utc::now());
        self.flush(&state);
    }

    pub fn start_instruction(
        &self,
        worker: &WorkerId,
        instruction_index: usize,
        goal: &str,
        episode_name: &str,
    ) {
        let mut state = self.state.lock();
        if let Some(slot) = state.workers.get_mut(&worker.to_string()) {
            slot.in_progress = Some(InProgressInstruction {
                instruction_index,
                goal: goal.to_string(),
                episode_name: episode_name.to_string(),
                current_step: 0,
                start_time: Utc::now(),
            });
        }
        state.last_updated = Some(Utc::now());
        self.flush(&state);
    }

    pub fn update_step(&self, worker: &WorkerId, step: u32) {
        let mut state = self.state.lock();
        if let Some(in_progress) = state
            .workers
            .get_mut(&worker.to_string())
            .and_then(|slot| slot.in_progress.as_mut())
        {
            in_progress.current_step = step;
        }
        state.last_updated = Some(Utc::now());
        self.flush(&state);
    }

    pub fn complete_instruction(
        &self,
        worker: &WorkerId,
        instruction_index: usize,
        goal: &str,
        episode_name: &str,
        success: bool,
        error_message: Option<String>,
    ) {
        let mut state = self.state.lock();
        if let Some(slot) = state.workers.get_mut(&worker.to_string()) {
            slot.in_progress = None;
            let finished = FinishedInstruction {
                instruction_index,
                goal: goal.to_string(),
                episode_name: episode_name.to_string(),
                finished_at: Utc::now(),
                error_message,
            };
            if success {
                slot.completed.push(finished);
            } else {
                slot.failed.push(finished);
            }
        }
        state.last_updated = Some(Utc::now());
        self.flush(&state);
    }

    /// Current state, for summaries and tests.
    pub fn snapshot(&self) -> ProgressFile {
        self.state.lock().clone()
    }

    /// Multi-line human summary for the end of a run.
    pub fn summary(&self) -> String {
        let state = self.state.lock();
        let mut out = format!(
            "run {}: {}/{} completed, {} failed\n",
            state.run_id,
            state.total_completed(),
            state.total_instructions,
            state.total_failed(),
        );
        for (worker, slot) in &state.workers {
            out.push_str(&format!(
                "  {worker}: {}/{} ({:.1}%), {} failed\n",
                slot.completed.len(),
                slot.assigned(),
                slot.completion_percentage(),
                slot.failed.len(),
            ));
        }
        out
    }

    fn flush(&self, state: &ProgressFile) {
        match serde_json::to_vec_pretty(state) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&self.path, bytes) {
                    warn!(%err, "failed to write progress file");
                }
            }
            Err(err) => warn!(%err, "failed to serialize progress"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(name: &str) -> WorkerId {
        WorkerId(name.to_string())
    }

    #[test]
    fn lifecycle_updates_one_slot_only() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ProgressTracker::new(dir.path()).unwrap();
        tracker.setup_workers(
            &[
                (worker("alpha"), WorkerRange { start: 0, end: 5 }),
                (worker("beta"), WorkerRange { start: 5, end: 10 }),
            ],
            10,
        );

        tracker.start_instruction(&worker("alpha"), 0, "goal", "maps_x");
        tracker.update_step(&worker("alpha"), 3);

        let state = tracker.snapshot();
        let alpha = &state.workers["alpha"];
        assert_eq!(alpha.in_progress.as_ref().unwrap().current_step, 3);
        assert!(state.workers["beta"].in_progress.is_none());

        tracker.complete_instruction(&worker("alpha"), 0, "goal", "maps_x", true, None);
        let state = tracker.snapshot();
        assert_eq!(state.workers["alpha"].completed.len(), 1);
        assert!(state.workers["alpha"].in_progress.is_none());
        assert_eq!(state.total_completed(), 1);
    }

    #[test]
    fn progress_is_written_through_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ProgressTracker::new(dir.path()).unwrap();
        tracker.setup_workers(&[(worker("w"), WorkerRange { start: 0, end: 2 })], 2);
        tracker.complete_instruction(
            &worker("w"),
            0,
            "g",
            "eps",
            false,
            Some("all retries failed".to_string()),
        );

        let bytes = std::fs::read(dir.path().join(PROGRESS_FILE)).unwrap();
        let loaded: ProgressFile = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(loaded.total_failed(), 1);
        assert_eq!(
            loaded.workers["w"].failed[0].error_message.as_deref(),
            Some("all retries failed")
        );
    }

    #[test]
    fn concurrent_writes_from_many_workers() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = std::sync::Arc::new(ProgressTracker::new(dir.path()).unwrap());
        let workers: Vec<(WorkerId, WorkerRange)> = (0..4)
            .map(|i| {
                (
                    worker(&format!("w{i}")),
                    WorkerRange {
                        start: i * 5,
                        end: (i + 1) * 5,
                    },
                )
            })
            .collect();
        tracker.setup_workers(&workers, 20);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    let id = worker(&format!("w{i}"));
                    for n in 0..5 {
                        tracker.start_instruction(&id, i * 5 + n, "g", "eps");
                        tracker.complete_instruction(&id, i * 5 + n, "g", "eps", true, None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.snapshot().total_completed(), 20);
    }
}
