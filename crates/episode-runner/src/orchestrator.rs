//! Episode orchestration across per-account workers.
//!
//! Each worker owns exactly one browser session, acquired at start and
//! released through a single teardown point on every exit path. Within a
//! worker, episodes run strictly sequentially on the same session so
//! login/cookie state carries across instructions.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use browser_port::{BrowserSession, DriverError, PageDriver};
use oracle_client::DecisionOracle;
use trail_types::{Episode, EpisodeStatus, WorkerId};
use trajectory_store::{episode_name, TrajectoryStore};

use crate::config::RunnerConfig;
use crate::errors::RunnerError;
use crate::instructions::{Instruction, WorkerRange};
use crate::machine::StepMachine;
use crate::progress::ProgressTracker;

/// One worker's identity and assignment.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub id: WorkerId,
    /// Persistent browser profile directory for this worker's account.
    pub profile_dir: PathBuf,
    pub range: WorkerRange,
}

/// Creates one browser session per worker. Implemented over CDP by the
/// CLI and by the scripted session in tests.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self, spec: &WorkerSpec) -> Result<Arc<dyn BrowserSession>, DriverError>;
}

/// Runs instruction ranges across isolated workers.
pub struct Orchestrator {
    config: RunnerConfig,
    results_dir: PathBuf,
    oracle: Arc<dyn DecisionOracle>,
    factory: Arc<dyn SessionFactory>,
    tracker: Option<Arc<ProgressTracker>>,
}

impl Orchestrator {
    pub fn new(
        config: RunnerConfig,
        results_dir: PathBuf,
        oracle: Arc<dyn DecisionOracle>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            config,
            results_dir,
            oracle,
            factory,
            tracker: None,
        }
    }

    /// Builder: attach the shared progress tracker.
    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Run every worker over its range; workers are parallel tasks, and a
    /// failing worker never takes the others down.
    pub async fn run(
        &self,
        instructions: Arc<Vec<Instruction>>,
        workers: Vec<WorkerSpec>,
    ) -> Result<(), RunnerError> {
        for spec in &workers {
            spec.range.validate(instructions.len())?;
        }
        if let Some(tracker) = &self.tracker {
            let assignments: Vec<_> = workers
                .iter()
                .map(|w| (w.id.clone(), w.range))
                .collect();
            tracker.setup_workers(&assignments, instructions.len());
        }

        let mut tasks = JoinSet::new();
        for spec in workers {
            let instructions = instructions.clone();
            let config = self.config.clone();
            let results_dir = self.results_dir.clone();
            let oracle = self.oracle.clone();
            let factory = self.factory.clone();
            let tracker = self.tracker.clone();
            tasks.spawn(async move {
                let id = spec.id.clone();
                let result = run_worker(
                    spec,
                    instructions,
                    config,
                    results_dir,
                    oracle,
                    factory,
                    tracker,
                )
                .await;
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(()))) => info!(worker = %id, "worker finished"),
                Ok((id, Err(err))) => error!(worker = %id, %err, "worker failed"),
                Err(err) => error!(%err, "worker task panicked"),
            }
        }
        Ok(())
    }
}

/// One worker: acquire the session, run the range, tear down once.
async fn run_worker(
    spec: WorkerSpec,
    instructions: Arc<Vec<Instruction>>,
    config: RunnerConfig,
    results_dir: PathBuf,
    oracle: Arc<dyn DecisionOracle>,
    factory: Arc<dyn SessionFactory>,
    tracker: Option<Arc<ProgressTracker>>,
) -> Result<(), RunnerError> {
    info!(worker = %spec.id, range = ?spec.range, "starting worker");
    let session = factory.create(&spec).await?;

    let result = worker_loop(
        &spec,
        session.clone(),
        &instructions,
        &config,
        &results_dir,
        oracle,
        tracker,
    )
    .await;

    // The single teardown point for this worker's session.
    if let Err(err) = session.close().await {
        warn!(worker = %spec.id, %err, "session teardown reported an error");
    }
    result
}

async fn worker_loop(
    spec: &WorkerSpec,
    session: Arc<dyn BrowserSession>,
    instructions: &[Instruction],
    config: &RunnerConfig,
    results_dir: &std::path::Path,
    oracle: Arc<dyn DecisionOracle>,
    tracker: Option<Arc<ProgressTracker>>,
) -> Result<(), RunnerError> {
    let mut page: Arc<dyn PageDriver> = session.open_page().await?;

    for index in spec.range.start..spec.range.end {
        let instruction = &instructions[index];
        let name = episode_name(&instruction.url);
        info!(
            worker = %spec.id,
            instruction = index,
            episode = %name,
            goal = %instruction.augmented,
            "starting instruction"
        );

        let store = match TrajectoryStore::allocate(results_dir, &name) {
            Ok(store) => store,
            Err(err) => {
                error!(%err, "failed to allocate episode storage");
                complete(&tracker, spec, index, instruction, &name, false, Some(err.to_string()));
                continue;
            }
        };
        if let Some(tracker) = &tracker {
            tracker.start_instruction(&spec.id, index, &instruction.augmented, &name);
        }

        let mut episode = Episode::new(
            name.clone(),
            instruction.persona.clone(),
            instruction.url.clone(),
            instruction.augmented.clone(),
        );

        if let Err(err) = page.navigate(&instruction.url).await {
            error!(%err, "initial navigation failed");
            episode.close(EpisodeStatus::Failed);
            if let Err(err) = store.record_episode(&episode) {
                warn!(%err, "failed to record episode metadata");
            }
            complete(&tracker, spec, index, instruction, &name, false, Some(err.to_string()));
            // A fresh page for the next instruction; the session survives.
            page = session.open_page().await?;
            continue;
        }

        let mut machine = StepMachine::new(
            session.clone(),
            page.clone(),
            oracle.clone(),
            config.clone(),
        );
        if let Some(tracker) = tracker.clone() {
            let id = spec.id.clone();
            machine.set_step_observer(move |step| tracker.update_step(&id, step));
        }

        if let Err(err) = machine.run(&mut episode, &store).await {
            error!(%err, "episode run aborted");
            if episode.status == EpisodeStatus::Running {
                episode.close(EpisodeStatus::Failed);
            }
        }

        if let Err(err) = store.record_episode(&episode) {
            warn!(%err, "failed to record episode metadata");
        }
        let success = episode.is_success();
        let error_message = (!success).then(|| episode.status.termination_reason().to_string());
        complete(&tracker, spec, index, instruction, &name, success, error_message);

        // Continue on whatever page the machine ended up on, preserving
        // the session (logins, cookies) across instructions.
        page = machine.page();
    }

    Ok(())
}

fn complete(
    tracker: &Option<Arc<ProgressTracker>>,
    spec: &WorkerSpec,
    index: usize,
    instruction: &Instruction,
    episode_name: &str,
    success: bool,
    error_message: Option<String>,
) {
    if let Some(tracker) = tracker {
        tracker.complete_instruction(
            &spec.id,
            index,
            &instruction.augmented,
            episode_name,
            success,
            error_message,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_port::ScriptedSession;
    use oracle_client::ScriptedOracle;
    use parking_lot::Mutex;

    struct ScriptedFactory {
        sessions: Mutex<Vec<Arc<ScriptedSession>>>,
    }

    #[async_trait]
    impl SessionFactory for ScriptedFactory {
        async fn create(
            &self,
            _spec: &WorkerSpec,
        ) -> Result<Arc<dyn BrowserSession>, DriverError> {
            let session = ScriptedSession::new();
            let page = session.prepare_page();
            page.queue_elements(serde_json::json!([]));
            self.sessions.lock().push(session.clone());
            Ok(session)
        }
    }

    fn instruction(i: usize) -> Instruction {
        Instruction {
            persona: "p".to_string(),
            url: "https://example.com".to_string(),
            original: format!("orig {i}"),
            augmented: format!("aug {i}"),
        }
    }

    #[tokio::test]
    async fn workers_get_isolated_sessions_and_close_them() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory {
            sessions: Mutex::new(Vec::new()),
        });
        let oracle = Arc::new(ScriptedOracle::new());
        // Two workers, one instruction each; both complete immediately.
        oracle.push_completion("done");
        oracle.push_completion("done");

        let tracker = Arc::new(ProgressTracker::new(dir.path()).unwrap());
        let orchestrator = Orchestrator::new(
            RunnerConfig::minimal(),
            dir.path().to_path_buf(),
            oracle,
            factory.clone(),
        )
        .with_tracker(tracker.clone());

        let instructions = Arc::new(vec![instruction(0), instruction(1)]);
        let workers = vec![
            WorkerSpec {
                id: WorkerId("alpha".to_string()),
                profile_dir: dir.path().join("alpha"),
                range: WorkerRange { start: 0, end: 1 },
            },
            WorkerSpec {
                id: WorkerId("beta".to_string()),
                profile_dir: dir.path().join("beta"),
                range: WorkerRange { start: 1, end: 2 },
            },
        ];
        orchestrator.run(instructions, workers).await.unwrap();

        let sessions = factory.sessions.lock();
        assert_eq!(sessions.len(), 2);
        for session in sessions.iter() {
            assert!(session.is_closed());
        }
        assert_eq!(tracker.snapshot().total_completed(), 2);
    }

    #[tokio::test]
    async fn invalid_range_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory {
            sessions: Mutex::new(Vec::new()),
        });
        let orchestrator = Orchestrator::new(
            RunnerConfig::minimal(),
            dir.path().to_path_buf(),
            Arc::new(ScriptedOracle::new()),
            factory,
        );

        let workers = vec![WorkerSpec {
            id: WorkerId("w".to_string()),
            profile_dir: dir.path().join("w"),
            range: WorkerRange { start: 0, end: 9 },
        }];
        let result = orchestrator
            .run(Arc::new(vec![instruction(0)]), workers)
            .await;
        assert!(result.is_err());
    }
}
