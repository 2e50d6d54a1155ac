//! The per-step state machine.
//!
//! One step flows Capturing → Deciding → Executing → TabCheck → Recording;
//! a failed execution takes the Retrying edge back into Deciding with the
//! accumulated failed-candidate context, bounded by the per-step round
//! budget. All context lives in the [`trail_types::Episode`] passed
//! through the machine, not in ambient state.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use action_executor::{ActionExecutor, ExecutorConfig, TabPolicy, TabWatcher};
use browser_port::{BrowserSession, PageDriver};
use oracle_client::{DecisionOracle, HistoryEntry, OracleRequest};
use page_perceiver::{annotate_screenshot, summarize, PageCapture, PagePerceiver, PerceiverConfig};
use trail_types::{
    Decision, Episode, EpisodeStatus, EngineError, ExecutionAttempt, StateSummaryEntry,
    StepOutcome, StepRecord, TabSnapshot, NOTE_FALLBACK_SELECTOR, NOTE_TAB_BRANCH,
};
use trajectory_store::{ErrorLogEntry, TrajectoryStore};

use crate::config::RunnerConfig;
use crate::errors::RunnerError;

type StepObserver = Box<dyn Fn(u32) + Send + Sync>;

/// Where one step's decision rounds ended up.
enum StepVerdict {
    /// Oracle signaled completion; nothing was executed.
    Completed(Decision),
    /// An action succeeded (directly or via fallback).
    Success {
        decision: Decision,
        attempts: Vec<ExecutionAttempt>,
        fallback: bool,
        tab_branch: bool,
    },
    /// Every round of the budget failed.
    Failed {
        decision: Decision,
        attempts: Vec<ExecutionAttempt>,
    },
    /// Decision-level failure, fatal for the episode before execution.
    EpisodeAbort(EngineError),
}

/// Sequences collection → decision → execution → tab check → recording
/// for one episode.
pub struct StepMachine {
    session: Arc<dyn BrowserSession>,
    page: Arc<dyn PageDriver>,
    oracle: Arc<dyn DecisionOracle>,
    config: RunnerConfig,
    perceiver: PagePerceiver,
    executor: ActionExecutor,
    watcher: TabWatcher,
    history: Vec<HistoryEntry>,
    step_observer: Option<StepObserver>,
}

impl StepMachine {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        page: Arc<dyn PageDriver>,
        oracle: Arc<dyn DecisionOracle>,
        config: RunnerConfig,
    ) -> Self {
        let perceiver = PagePerceiver::new(page.clone()).with_config(PerceiverConfig {
            max_elements: config.max_elements,
        });
        let executor = ActionExecutor::new(page.clone()).with_config(ExecutorConfig {
            action_timeout_ms: config.action_timeout_ms,
        });
        let watcher = TabWatcher::new(session.clone());
        Self {
            session,
            page,
            oracle,
            config,
            perceiver,
            executor,
            watcher,
            history: Vec::new(),
            step_observer: None,
        }
    }

    /// The page currently driven; callers reuse it across instructions.
    pub fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    /// Observe step indices as they start (progress tracking).
    pub fn set_step_observer(&mut self, observer: impl Fn(u32) + Send + Sync + 'static) {
        self.step_observer = Some(Box::new(observer));
    }

    fn set_page(&mut self, page: Arc<dyn PageDriver>) {
        self.perceiver.set_driver(page.clone());
        self.executor.set_driver(page.clone());
        self.page = page;
    }

    /// Drive the episode to a terminal status.
    ///
    /// Terminal conditions are encoded in the episode; `Err` is reserved
    /// for provenance-layer failures.
    pub async fn run(
        &mut self,
        episode: &mut Episode,
        store: &TrajectoryStore,
    ) -> Result<(), RunnerError> {
        info!(episode = %episode.name, goal = %episode.current_goal, "starting episode");
        self.history.clear();

        loop {
            let index = episode.step_count;

            // Guard precedes capture.
            if index >= self.config.max_steps {
                warn!(
                    error = %EngineError::MaxStepsExceeded(self.config.max_steps),
                    "terminating episode"
                );
                episode.close(EpisodeStatus::MaxStepsExceeded);
                return Ok(());
            }
            if let Some(observer) = &self.step_observer {
                observer(index);
            }

            // Capturing.
            let capture = match self.capture_with_recovery(episode).await {
                Ok(capture) => capture,
                Err(err) => {
                    error!(%err, "capture failed after recovery attempt");
                    episode.close(EpisodeStatus::Failed);
                    return Ok(());
                }
            };

            let screenshot_ref = store.write_screenshot(index, &capture.screenshot)?;
            let state_ref = store.write_state_snapshot(index, &capture.descriptors)?;
            match annotate_screenshot(&capture.screenshot, &capture.descriptors) {
                Ok(png) => {
                    if let Err(err) = store.write_annotated_screenshot(index, &png) {
                        warn!(%err, "failed to persist annotated screenshot");
                    }
                }
                Err(err) => warn!(%err, "screenshot annotation failed"),
            }

            let summary = summarize(&capture.descriptors);
            if let Ok(text) = serde_json::to_string_pretty(&summary) {
                if let Err(err) = store.write_oracle_summary(index, &text) {
                    warn!(%err, "failed to persist oracle summary");
                }
            }

            // Deciding / Executing / TabCheck, with the bounded retry edge.
            match self
                .run_rounds(episode, store, index, &capture, &summary)
                .await?
            {
                StepVerdict::Completed(decision) => {
                    info!(
                        summary = %decision
                            .completion
                            .as_ref()
                            .map(|c| c.summary.as_str())
                            .unwrap_or(""),
                        "oracle signaled completion"
                    );
                    episode.close(EpisodeStatus::Completed);
                    return Ok(());
                }
                StepVerdict::Success {
                    decision,
                    attempts,
                    fallback,
                    tab_branch,
                } => {
                    let note = if tab_branch {
                        NOTE_TAB_BRANCH
                    } else if fallback {
                        NOTE_FALLBACK_SELECTOR
                    } else {
                        ""
                    };
                    let had_failures = attempts.iter().any(|a| !a.succeeded);
                    let record = StepRecord {
                        episode_id: episode.id.clone(),
                        index,
                        screenshot_ref: Some(screenshot_ref),
                        state_ref: Some(state_ref),
                        decision: decision.clone(),
                        attempts,
                        outcome: StepOutcome::Success,
                        note: note.to_string(),
                        timestamp: chrono::Utc::now(),
                    };

                    // The single recording path: direct and fallback
                    // successes differ only in the note.
                    store.record_step(&record)?;
                    if had_failures {
                        store.append_error(
                            ErrorLogEntry::from_attempts(
                                index,
                                record.decision.description.clone(),
                                &record.attempts,
                                "previous attempts failed",
                            )
                            .with_context(
                                record.decision.thought.clone(),
                                episode.current_goal.clone(),
                            ),
                        )?;
                    }

                    if let Some(action) = &decision.action {
                        self.history.push(HistoryEntry {
                            index,
                            description: decision.description.clone(),
                            action: action.kind_name().to_string(),
                        });
                    }
                    episode.step_count = index + 1;

                    if tab_branch {
                        episode.close(EpisodeStatus::TabBranchTerminated);
                        return Ok(());
                    }

                    if self.config.settle_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms))
                            .await;
                    }
                }
                StepVerdict::Failed { decision, attempts } => {
                    let record = StepRecord {
                        episode_id: episode.id.clone(),
                        index,
                        screenshot_ref: Some(screenshot_ref),
                        state_ref: Some(state_ref),
                        decision,
                        attempts,
                        outcome: StepOutcome::Failed,
                        note: String::new(),
                        timestamp: chrono::Utc::now(),
                    };
                    store.record_step(&record)?;
                    episode.step_count = index + 1;
                    episode.close(EpisodeStatus::Failed);
                    return Ok(());
                }
                StepVerdict::EpisodeAbort(err) => {
                    error!(%err, "episode aborted during decision");
                    episode.close(EpisodeStatus::Failed);
                    return Ok(());
                }
            }
        }
    }

    /// Run the decision rounds for one step.
    async fn run_rounds(
        &mut self,
        episode: &mut Episode,
        store: &TrajectoryStore,
        index: u32,
        capture: &PageCapture,
        summary: &[StateSummaryEntry],
    ) -> Result<StepVerdict, RunnerError> {
        let mut attempts_all: Vec<ExecutionAttempt> = Vec::new();
        let mut failed_candidates: Vec<String> = Vec::new();
        let mut error_context: Option<String> = None;
        let mut round = 0u32;

        loop {
            round += 1;

            let mut request =
                OracleRequest::new(episode.original_goal.clone(), episode.current_goal.clone())
                    .with_summary(summary.to_vec())
                    .with_history(self.history.clone());
            if !failed_candidates.is_empty() || error_context.is_some() {
                request = request.with_retry_context(
                    failed_candidates.clone(),
                    error_context.clone().unwrap_or_default(),
                );
            }

            let decision = match self.oracle.decide(&request).await {
                Ok(Some(decision)) => decision,
                Ok(None) => {
                    warn!("oracle returned null response");
                    return Ok(StepVerdict::EpisodeAbort(EngineError::NullDecision));
                }
                Err(err) => {
                    return Ok(StepVerdict::EpisodeAbort(EngineError::OracleUnavailable(
                        err.to_string(),
                    )))
                }
            };

            if let Some(tokens) = decision.tokens_used {
                episode.token_usage += tokens;
            }
            if let Some(goal) = &decision.updated_goal {
                debug!(%goal, "oracle updated the working goal");
                episode.current_goal = goal.clone();
            }
            if decision.is_completion() {
                return Ok(StepVerdict::Completed(decision));
            }
            let Some(action) = decision.action.clone() else {
                warn!("oracle response carried neither action nor completion");
                return Ok(StepVerdict::EpisodeAbort(EngineError::NullDecision));
            };

            let before = self.tab_snapshot().await;
            debug!(action = action.kind_name(), round, "executing action");
            let report = self
                .executor
                .execute(&action, &capture.descriptors, &failed_candidates)
                .await;
            attempts_all.extend(report.attempts.iter().cloned());

            if report.succeeded {
                let after = self.tab_snapshot().await;
                let delta = before.delta(&after);
                if delta.has_new_tabs {
                    TabWatcher::report_branch(&delta);
                    match self.config.tab_policy {
                        TabPolicy::Terminate => {
                            return Ok(StepVerdict::Success {
                                decision,
                                attempts: attempts_all,
                                fallback: report.fallback_used,
                                tab_branch: true,
                            })
                        }
                        TabPolicy::Follow => match self.session.adopt_latest_page().await {
                            Ok(page) => {
                                info!("following new tab");
                                self.set_page(page);
                            }
                            Err(err) => {
                                warn!(%err, "failed to adopt new tab, staying on current page")
                            }
                        },
                    }
                }
                return Ok(StepVerdict::Success {
                    decision,
                    attempts: attempts_all,
                    fallback: report.fallback_used,
                    tab_branch: false,
                });
            }

            // Failed round: document it, widen the context, maybe retry.
            let final_message = report.final_error_message();
            warn!(round, %final_message, "action round failed");
            store.append_error(
                ErrorLogEntry::from_attempts(
                    index,
                    decision.description.clone(),
                    &report.attempts,
                    final_message.clone(),
                )
                .with_context(decision.thought.clone(), episode.current_goal.clone()),
            )?;

            for name in report.failed_candidate_names() {
                if !failed_candidates.contains(&name) {
                    failed_candidates.push(name);
                }
            }
            error_context = Some(final_message);

            if round >= self.config.max_retries {
                warn!(
                    error = %EngineError::MaxRetriesExceeded(self.config.max_retries),
                    "failing step"
                );
                return Ok(StepVerdict::Failed {
                    decision,
                    attempts: attempts_all,
                });
            }
        }
    }

    /// Capture with exactly one page-recreate recovery attempt.
    async fn capture_with_recovery(
        &mut self,
        episode: &Episode,
    ) -> Result<PageCapture, EngineError> {
        let first_err = match self.perceiver.capture().await {
            Ok(capture) => return Ok(capture),
            Err(err) => err,
        };

        warn!(%first_err, "capture failed, recreating page");
        let page = self
            .session
            .open_page()
            .await
            .map_err(|e| EngineError::PageUnavailable(e.to_string()))?;
        page.navigate(&episode.start_url)
            .await
            .map_err(|e| EngineError::PageUnavailable(e.to_string()))?;
        self.set_page(page);

        self.perceiver.capture().await.map_err(|second_err| {
            EngineError::PageUnavailable(format!(
                "capture failed twice: {first_err}; then {second_err}"
            ))
        })
    }

    /// Tab snapshot; an unreadable topology degrades to empty rather than
    /// failing the step.
    async fn tab_snapshot(&self) -> TabSnapshot {
        match self.watcher.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "tab snapshot failed");
                TabSnapshot::empty()
            }
        }
    }
}
