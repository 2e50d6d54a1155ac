//! Runner configuration.

use serde::{Deserialize, Serialize};

use action_executor::TabPolicy;

/// Configuration for episode execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Step ceiling per episode; checked before capture is attempted.
    /// Default: 40
    pub max_steps: u32,

    /// Oracle round-trips allowed per step (the initial decision
    /// included); once every round's execution failed the step is
    /// terminally failed and with it the episode.
    /// Default: 2
    pub max_retries: u32,

    /// Deadline for each individual action attempt in milliseconds.
    /// Default: 10000
    pub action_timeout_ms: u64,

    /// Settle wait after a successful step before the next capture.
    /// Default: 2000
    pub settle_delay_ms: u64,

    /// What to do when an action opens a new tab.
    /// Default: terminate the episode as completed.
    #[serde(default)]
    pub tab_policy: TabPolicy,

    /// Descriptor cap per capture.
    /// Default: 500
    pub max_elements: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_steps: 40,
            max_retries: 2,
            action_timeout_ms: 10_000,
            settle_delay_ms: 2_000,
            tab_policy: TabPolicy::default(),
            max_elements: 500,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast config for tests: no settle wait, tight timeouts.
    pub fn minimal() -> Self {
        Self {
            max_steps: 10,
            max_retries: 2,
            action_timeout_ms: 500,
            settle_delay_ms: 0,
            tab_policy: TabPolicy::default(),
            max_elements: 100,
        }
    }

    /// Builder: set the step ceiling.
    pub fn max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps;
        self
    }

    /// Builder: set the per-step round budget.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builder: set the tab policy.
    pub fn tab_policy(mut self, policy: TabPolicy) -> Self {
        self.tab_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_steps, 40);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.action_timeout_ms, 10_000);
        assert_eq!(config.tab_policy, TabPolicy::Terminate);
    }

    #[test]
    fn builder_overrides() {
        let config = RunnerConfig::new().max_steps(5).max_retries(1);
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.max_retries, 1);
    }
}
