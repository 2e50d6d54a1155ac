//! Application configuration.
//!
//! Layered loading: defaults ← optional config file ← `TRAILFORGE__*`
//! environment overrides. Worker ranges come either from explicit
//! per-account indices or from automatic even assignment.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use episode_runner::{assign_ranges, RunnerConfig, WorkerRange, WorkerSpec};
use trail_types::WorkerId;

/// Oracle endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Decision endpoint URL.
    pub endpoint: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_key_env() -> String {
    "ORACLE_API_KEY".to_string()
}

fn default_oracle_timeout_ms() -> u64 {
    60_000
}

/// Browser launch settings shared by all workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default)]
    pub headless: bool,
    /// Explicit Chromium executable; autodetected when absent.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

fn default_window_width() -> u32 {
    1440
}

fn default_window_height() -> u32 {
    900
}

/// One account: a worker identity plus its persistent browser profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Worker label (shows up in progress tracking and logs).
    pub label: String,
    /// Profile directory name under `sessions_dir`.
    pub profile_dir: String,
    /// Manual range bounds; ignored when `auto_index` is on.
    #[serde(default)]
    pub start_idx: Option<usize>,
    #[serde(default)]
    pub end_idx: Option<usize>,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
    pub oracle: OracleSettings,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    pub accounts: Vec<AccountConfig>,
    /// Compute contiguous ranges automatically from the account order.
    #[serde(default = "default_true")]
    pub auto_index: bool,
    /// Optional cap on how many instructions this run processes.
    #[serde(default)]
    pub max_instructions: Option<usize>,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("data/results")
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("data/browser_sessions")
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from an optional file plus environment
    /// overrides (`TRAILFORGE__RUNNER__MAX_STEPS=10` style).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("trailforge").required(false)),
        };
        let settings = builder
            .add_source(config::Environment::with_prefix("TRAILFORGE").separator("__"))
            .build()
            .context("failed to assemble configuration")?;
        settings
            .try_deserialize()
            .context("failed to deserialize configuration")
    }

    /// Manifest path for a generation phase.
    pub fn manifest_path(&self, phase: u8) -> PathBuf {
        self.results_dir
            .join(format!("instructions_phase{phase}.json"))
    }

    /// Resolve accounts into worker specs over `total` instructions.
    pub fn worker_specs(&self, total: usize) -> Result<Vec<WorkerSpec>> {
        if self.accounts.is_empty() {
            bail!("no accounts configured");
        }
        let effective_total = match self.max_instructions {
            Some(cap) => total.min(cap),
            None => total,
        };

        let specs = if self.auto_index {
            let ranges = assign_ranges(effective_total, self.accounts.len());
            self.accounts
                .iter()
                .zip(ranges)
                .map(|(account, range)| self.spec(account, range))
                .collect()
        } else {
            self.accounts
                .iter()
                .map(|account| {
                    let (Some(start), Some(end)) = (account.start_idx, account.end_idx) else {
                        bail!(
                            "account '{}' needs start_idx/end_idx when auto_index is off",
                            account.label
                        );
                    };
                    Ok(self.spec(account, WorkerRange { start, end }))
                })
                .collect::<Result<Vec<_>>>()?
        };
        Ok(specs)
    }

    fn spec(&self, account: &AccountConfig, range: WorkerRange) -> WorkerSpec {
        WorkerSpec {
            id: WorkerId(account.label.clone()),
            profile_dir: self.sessions_dir.join(&account.profile_dir),
            range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(accounts: Vec<AccountConfig>, auto_index: bool) -> AppConfig {
        AppConfig {
            results_dir: default_results_dir(),
            sessions_dir: default_sessions_dir(),
            oracle: OracleSettings {
                endpoint: "https://oracle.example/decide".to_string(),
                api_key_env: default_api_key_env(),
                timeout_ms: 1_000,
            },
            runner: RunnerConfig::default(),
            browser: BrowserSettings::default(),
            accounts,
            auto_index,
            max_instructions: None,
        }
    }

    fn account(label: &str) -> AccountConfig {
        AccountConfig {
            label: label.to_string(),
            profile_dir: label.to_string(),
            start_idx: None,
            end_idx: None,
        }
    }

    #[test]
    fn auto_index_splits_instructions_evenly() {
        let config = base_config(vec![account("a"), account("b"), account("c")], true);
        let specs = config.worker_specs(25).unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].range, WorkerRange { start: 0, end: 9 });
        assert_eq!(specs[2].range, WorkerRange { start: 17, end: 25 });
        assert!(specs[0].profile_dir.ends_with("a"));
    }

    #[test]
    fn max_instructions_caps_assignment() {
        let mut config = base_config(vec![account("a"), account("b")], true);
        config.max_instructions = Some(4);
        let specs = config.worker_specs(100).unwrap();
        assert_eq!(specs[0].range, WorkerRange { start: 0, end: 2 });
        assert_eq!(specs[1].range, WorkerRange { start: 2, end: 4 });
    }

    #[test]
    fn manual_ranges_require_bounds() {
        let mut broken = account("a");
        broken.start_idx = Some(0);
        let config = base_config(vec![broken], false);
        assert!(config.worker_specs(10).is_err());

        let mut ok = account("b");
        ok.start_idx = Some(2);
        ok.end_idx = Some(7);
        let config = base_config(vec![ok], false);
        let specs = config.worker_specs(10).unwrap();
        assert_eq!(specs[0].range, WorkerRange { start: 2, end: 7 });
    }

    #[test]
    fn manifest_path_embeds_phase() {
        let config = base_config(vec![account("a")], true);
        assert!(config
            .manifest_path(2)
            .ends_with("instructions_phase2.json"));
    }
}
