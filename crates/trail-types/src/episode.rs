//! Episode identity and lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique id of one episode (one instruction attempt).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeId(pub String);

impl EpisodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one worker (one account/browser profile).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal and in-flight states of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    Running,
    Completed,
    Failed,
    MaxStepsExceeded,
    /// Completed because an action opened a new tab (see tab policy).
    TabBranchTerminated,
}

impl EpisodeStatus {
    /// Whether this status counts as a successful trajectory.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            EpisodeStatus::Completed | EpisodeStatus::TabBranchTerminated
        )
    }

    /// Reason string recorded in episode metadata.
    pub fn termination_reason(&self) -> &'static str {
        match self {
            EpisodeStatus::Running => "running",
            EpisodeStatus::Completed => "completed",
            EpisodeStatus::Failed => "failed",
            EpisodeStatus::MaxStepsExceeded => "max steps exceeded",
            EpisodeStatus::TabBranchTerminated => "tab branch",
        }
    }
}

/// One complete attempt to satisfy a single instruction.
///
/// Created when the instruction is dequeued, mutated only by the step
/// machine, closed when a terminal status is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    /// Printable `{site}_{uuid}` name used for the artifact namespace.
    pub name: String,
    pub persona: String,
    pub start_url: String,
    pub original_goal: String,
    /// Oracle-updated sub-goal; starts equal to the goal under execution.
    pub current_goal: String,
    pub status: EpisodeStatus,
    pub step_count: u32,
    pub token_usage: u64,
    pub start_time: DateTime<Utc>,
    /// Wall-clock seconds from start to close; 0 while running.
    pub runtime_seconds: f64,
}

impl Episode {
    pub fn new(
        name: impl Into<String>,
        persona: impl Into<String>,
        start_url: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        let goal = goal.into();
        Self {
            id: EpisodeId::new(),
            name: name.into(),
            persona: persona.into(),
            start_url: start_url.into(),
            original_goal: goal.clone(),
            current_goal: goal,
            status: EpisodeStatus::Running,
            step_count: 0,
            token_usage: 0,
            start_time: Utc::now(),
            runtime_seconds: 0.0,
        }
    }

    /// Finalize the episode with a terminal status.
    pub fn close(&mut self, status: EpisodeStatus) {
        self.status = status;
        self.runtime_seconds = (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0;
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_episode_is_running() {
        let episode = Episode::new("maps_x", "traveler", "https://maps.example", "find a cafe");
        assert_eq!(episode.status, EpisodeStatus::Running);
        assert_eq!(episode.original_goal, episode.current_goal);
        assert_eq!(episode.step_count, 0);
    }

    #[test]
    fn close_sets_status_and_runtime() {
        let mut episode = Episode::new("a", "p", "https://e", "g");
        episode.close(EpisodeStatus::Completed);
        assert!(episode.is_success());
        assert!(episode.runtime_seconds >= 0.0);
    }

    #[test]
    fn tab_branch_counts_as_success() {
        assert!(EpisodeStatus::TabBranchTerminated.is_success());
        assert_eq!(
            EpisodeStatus::TabBranchTerminated.termination_reason(),
            "tab branch"
        );
        assert!(!EpisodeStatus::MaxStepsExceeded.is_success());
    }
}
