//! One-action interpreter with candidate fallback.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use browser_port::{DriverError, PageDriver};
use trail_types::{
    ActionSpec, AttemptErrorKind, ElementDescriptor, EngineError, ExecutionAttempt,
    SelectorCandidate,
};

/// Executor tunables.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deadline for each individual attempt.
    pub action_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 10_000,
        }
    }
}

/// Everything that happened while executing one action.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// One entry per candidate try, in execution order. Empty for
    /// actions that target no element.
    pub attempts: Vec<ExecutionAttempt>,
    pub succeeded: bool,
    /// True when success came from any candidate after the first.
    pub fallback_used: bool,
    /// Populated when the action as a whole failed.
    pub failure: Option<EngineError>,
}

impl ExecutionReport {
    fn success(attempts: Vec<ExecutionAttempt>, fallback_used: bool) -> Self {
        Self {
            attempts,
            succeeded: true,
            fallback_used,
            failure: None,
        }
    }

    fn failed(attempts: Vec<ExecutionAttempt>, failure: EngineError) -> Self {
        Self {
            attempts,
            succeeded: false,
            fallback_used: false,
            failure: Some(failure),
        }
    }

    /// The candidate that finally worked, if any.
    pub fn successful_candidate(&self) -> Option<&SelectorCandidate> {
        self.attempts
            .iter()
            .find(|a| a.succeeded)
            .map(|a| &a.candidate)
    }

    /// Describe-strings of every failed candidate, for oracle retry context.
    pub fn failed_candidate_names(&self) -> Vec<String> {
        self.attempts
            .iter()
            .filter(|a| !a.succeeded)
            .map(|a| a.candidate.describe())
            .collect()
    }

    /// Final error message for logs and retry context.
    pub fn final_error_message(&self) -> String {
        self.failure
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_default()
    }
}

/// Executes one structured action against the page.
pub struct ActionExecutor {
    driver: Arc<dyn PageDriver>,
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the underlying driver after a page was recreated.
    pub fn set_driver(&mut self, driver: Arc<dyn PageDriver>) {
        self.driver = driver;
    }

    /// Execute one action against the current capture's descriptors.
    ///
    /// `Click` walks the target's candidate chain in priority order and
    /// stops at the first success; candidates whose describe-form appears
    /// in `exclude` (failures from earlier rounds of the same step) are
    /// skipped so no candidate is ever retried within one step. The other
    /// kinds perform a single attempt under the same per-action timeout.
    pub async fn execute(
        &self,
        action: &ActionSpec,
        descriptors: &[ElementDescriptor],
        exclude: &[String],
    ) -> ExecutionReport {
        match action {
            ActionSpec::Click { target } => {
                self.execute_click(action, *target, descriptors, exclude).await
            }
            ActionSpec::Fill { target, text } => {
                self.execute_fill(action, *target, text, descriptors).await
            }
            ActionSpec::Scroll { dx, dy } => {
                self.execute_plain(self.driver.scroll_by(*dx, *dy)).await
            }
            ActionSpec::Wait { duration_ms } => {
                // Waiting is itself subject to the action deadline.
                self.execute_plain(async {
                    tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                    Ok(())
                })
                .await
            }
            ActionSpec::KeyPress { key } => self.execute_plain(self.driver.press_key(key)).await,
        }
    }

    async fn execute_click(
        &self,
        action: &ActionSpec,
        target: u32,
        descriptors: &[ElementDescriptor],
        exclude: &[String],
    ) -> ExecutionReport {
        let Some(descriptor) = ElementDescriptor::find(descriptors, target) else {
            return ExecutionReport::failed(
                Vec::new(),
                EngineError::ElementNotFound(format!(
                    "annotation id {target} not present in current capture"
                )),
            );
        };

        let mut attempts: Vec<ExecutionAttempt> = Vec::new();
        for candidate in &descriptor.selector_candidates {
            if exclude.contains(&candidate.describe()) {
                continue;
            }
            // The chain is deduplicated at construction; this guard keeps
            // the no-repeat property even if a chain was built elsewhere.
            if attempts.iter().any(|a| &a.candidate == candidate) {
                continue;
            }

            debug!(candidate = %candidate.describe(), "trying candidate");
            match self.attempt(self.driver.click(candidate)).await {
                Ok(()) => {
                    let fallback_used = !attempts.is_empty();
                    attempts.push(ExecutionAttempt::success(candidate.clone(), action.clone()));
                    if fallback_used {
                        info!(
                            candidate = %candidate.describe(),
                            failed = attempts.len() - 1,
                            "fallback candidate succeeded"
                        );
                    }
                    return ExecutionReport::success(attempts, fallback_used);
                }
                Err((kind, message)) => {
                    warn!(candidate = %candidate.describe(), %message, "candidate failed");
                    attempts.push(ExecutionAttempt::failure(
                        candidate.clone(),
                        action.clone(),
                        kind,
                        message.clone(),
                    ));
                    if kind == AttemptErrorKind::PageGone {
                        return ExecutionReport::failed(
                            attempts,
                            EngineError::PageUnavailable(message),
                        );
                    }
                }
            }
        }

        let tried = attempts.len();
        ExecutionReport::failed(
            attempts,
            EngineError::ElementNotFound(format!(
                "all {tried} candidates exhausted for annotation id {target}"
            )),
        )
    }

    /// Fill realizes the chain head only; there is no targeting ambiguity
    /// to absorb, so a miss goes straight to the retry budget.
    async fn execute_fill(
        &self,
        action: &ActionSpec,
        target: u32,
        text: &str,
        descriptors: &[ElementDescriptor],
    ) -> ExecutionReport {
        let Some(descriptor) = ElementDescriptor::find(descriptors, target) else {
            return ExecutionReport::failed(
                Vec::new(),
                EngineError::ElementNotFound(format!(
                    "annotation id {target} not present in current capture"
                )),
            );
        };
        let Some(candidate) = descriptor.selector_candidates.first() else {
            return ExecutionReport::failed(
                Vec::new(),
                EngineError::ElementNotFound(format!(
                    "annotation id {target} has no selector candidates"
                )),
            );
        };

        match self.attempt(self.driver.fill(candidate, text)).await {
            Ok(()) => ExecutionReport::success(
                vec![ExecutionAttempt::success(candidate.clone(), action.clone())],
                false,
            ),
            Err((kind, message)) => {
                let failure = match kind {
                    AttemptErrorKind::Timeout => {
                        EngineError::ActionTimeout(self.config.action_timeout_ms)
                    }
                    AttemptErrorKind::PageGone => EngineError::PageUnavailable(message.clone()),
                    _ => EngineError::ElementNotFound(message.clone()),
                };
                ExecutionReport::failed(
                    vec![ExecutionAttempt::failure(
                        candidate.clone(),
                        action.clone(),
                        kind,
                        message,
                    )],
                    failure,
                )
            }
        }
    }

    async fn execute_plain(
        &self,
        operation: impl std::future::Future<Output = Result<(), DriverError>>,
    ) -> ExecutionReport {
        match self.attempt(operation).await {
            Ok(()) => ExecutionReport::success(Vec::new(), false),
            Err((kind, message)) => {
                let failure = match kind {
                    AttemptErrorKind::Timeout => {
                        EngineError::ActionTimeout(self.config.action_timeout_ms)
                    }
                    AttemptErrorKind::PageGone => EngineError::PageUnavailable(message),
                    _ => EngineError::Internal(message),
                };
                ExecutionReport::failed(Vec::new(), failure)
            }
        }
    }

    /// Run one driver operation under the per-action deadline, folding the
    /// result into an attempt classification.
    async fn attempt(
        &self,
        operation: impl std::future::Future<Output = Result<(), DriverError>>,
    ) -> Result<(), (AttemptErrorKind, String)> {
        let deadline = Duration::from_millis(self.config.action_timeout_ms);
        match timeout(deadline, operation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err((err.attempt_kind(), err.to_string())),
            Err(_) => Err((
                AttemptErrorKind::Timeout,
                format!("exceeded {} ms", self.config.action_timeout_ms),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_port::{DriverError, ScriptedOutcome, ScriptedSession};
    use trail_types::{BoundingBox, ElementAttributes};

    fn descriptor_with_chain(id: u32, chain: Vec<SelectorCandidate>) -> ElementDescriptor {
        ElementDescriptor {
            annotation_id: id,
            role: "button".to_string(),
            name: "Create".to_string(),
            bounding_box: BoundingBox::new(100, 200, 80, 40),
            tag_name: "button".to_string(),
            attributes: ElementAttributes::default(),
            selector_candidates: chain,
        }
    }

    fn chain() -> Vec<SelectorCandidate> {
        vec![
            SelectorCandidate::DomId {
                css: "#create".to_string(),
            },
            SelectorCandidate::Coordinates { x: 140, y: 220 },
            SelectorCandidate::RoleName {
                role: "button".to_string(),
                name: "Create".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn primary_candidate_success_is_single_attempt() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let executor = ActionExecutor::new(page);

        let report = executor
            .execute(
                &ActionSpec::Click { target: 3 },
                &[descriptor_with_chain(3, chain())],
                &[],
            )
            .await;

        assert!(report.succeeded);
        assert!(!report.fallback_used);
        assert_eq!(report.attempts.len(), 1);
        assert!(report.attempts[0].succeeded);
    }

    #[tokio::test]
    async fn fallback_candidate_succeeds_after_primary_failure() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let primary = SelectorCandidate::DomId {
            css: "#create".to_string(),
        };
        page.script_interaction(
            &primary,
            ScriptedOutcome::Fail(DriverError::NotFound("no node".into())),
        );

        let executor = ActionExecutor::new(page);
        let report = executor
            .execute(
                &ActionSpec::Click { target: 0 },
                &[descriptor_with_chain(0, chain())],
                &[],
            )
            .await;

        assert!(report.succeeded);
        assert!(report.fallback_used);
        assert_eq!(report.attempts.len(), 2);
        assert!(!report.attempts[0].succeeded);
        assert!(report.attempts[1].succeeded);
        assert_eq!(
            report.successful_candidate(),
            Some(&SelectorCandidate::Coordinates { x: 140, y: 220 })
        );
    }

    #[tokio::test]
    async fn exhausted_chain_fails_with_every_attempt_recorded() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        for candidate in chain() {
            page.script_interaction(
                &candidate,
                ScriptedOutcome::Fail(DriverError::NotFound("gone".into())),
            );
        }

        let executor = ActionExecutor::new(page);
        let report = executor
            .execute(
                &ActionSpec::Click { target: 0 },
                &[descriptor_with_chain(0, chain())],
                &[],
            )
            .await;

        assert!(!report.succeeded);
        assert_eq!(report.attempts.len(), 3);
        assert!(matches!(
            report.failure,
            Some(EngineError::ElementNotFound(_))
        ));
        assert_eq!(report.failed_candidate_names().len(), 3);

        // No candidate is ever tried twice.
        let mut seen = std::collections::HashSet::new();
        for attempt in &report.attempts {
            assert!(seen.insert(attempt.candidate.describe()));
        }
    }

    #[tokio::test]
    async fn excluded_candidates_are_never_retried() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let executor = ActionExecutor::new(page);

        // Everything but the role_name candidate already failed in an
        // earlier round of the same step.
        let exclude = vec![
            "id:#create".to_string(),
            "coordinates:140,220".to_string(),
        ];
        let report = executor
            .execute(
                &ActionSpec::Click { target: 0 },
                &[descriptor_with_chain(0, chain())],
                &exclude,
            )
            .await;

        assert!(report.succeeded);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(
            report.attempts[0].candidate.kind(),
            trail_types::SelectorKind::RoleName
        );
    }

    #[tokio::test]
    async fn unknown_annotation_id_fails_without_attempts() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let executor = ActionExecutor::new(page);

        let report = executor
            .execute(&ActionSpec::Click { target: 42 }, &[], &[])
            .await;
        assert!(!report.succeeded);
        assert!(report.attempts.is_empty());
        assert!(matches!(
            report.failure,
            Some(EngineError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn hanging_interaction_times_out() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let primary = SelectorCandidate::DomId {
            css: "#create".to_string(),
        };
        page.script_interaction(&primary, ScriptedOutcome::Hang);

        let executor = ActionExecutor::new(page).with_config(ExecutorConfig {
            action_timeout_ms: 50,
        });
        let report = executor
            .execute(
                &ActionSpec::Click { target: 0 },
                &[descriptor_with_chain(
                    0,
                    vec![SelectorCandidate::DomId {
                        css: "#create".to_string(),
                    }],
                )],
                &[],
            )
            .await;

        assert!(!report.succeeded);
        assert_eq!(
            report.attempts[0].error.as_ref().unwrap().kind,
            AttemptErrorKind::Timeout
        );
    }

    #[tokio::test]
    async fn fill_uses_chain_head_only() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let executor = ActionExecutor::new(page.clone());

        let report = executor
            .execute(
                &ActionSpec::Fill {
                    target: 0,
                    text: "hello".to_string(),
                },
                &[descriptor_with_chain(0, chain())],
                &[],
            )
            .await;

        assert!(report.succeeded);
        assert_eq!(report.attempts.len(), 1);
        assert!(page
            .operations()
            .iter()
            .any(|op| op.starts_with("fill[hello] id:#create")));
    }

    #[tokio::test]
    async fn wait_longer_than_deadline_is_action_timeout() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let executor = ActionExecutor::new(page).with_config(ExecutorConfig {
            action_timeout_ms: 30,
        });

        let report = executor
            .execute(&ActionSpec::Wait { duration_ms: 10_000 }, &[], &[])
            .await;
        assert!(!report.succeeded);
        assert!(matches!(report.failure, Some(EngineError::ActionTimeout(30))));
    }

    #[tokio::test]
    async fn scroll_and_key_press_have_no_attempts() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let executor = ActionExecutor::new(page.clone());

        let scroll = executor
            .execute(&ActionSpec::Scroll { dx: 0, dy: 400 }, &[], &[])
            .await;
        assert!(scroll.succeeded);
        assert!(scroll.attempts.is_empty());

        let key = executor
            .execute(
                &ActionSpec::KeyPress {
                    key: "Enter".to_string(),
                },
                &[],
                &[],
            )
            .await;
        assert!(key.succeeded);
        assert!(page.operations().iter().any(|op| op == "press Enter"));
    }
}
