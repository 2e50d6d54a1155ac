//! Launch configuration for the CDP-backed session.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How to launch (or attach to) the Chromium instance for one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Run without a visible window.
    pub headless: bool,

    /// Persistent profile directory; keeps logins/cookies across the
    /// instructions a worker executes.
    pub user_data_dir: Option<PathBuf>,

    /// Explicit browser executable; autodetected when absent.
    pub executable: Option<PathBuf>,

    /// Viewport size.
    pub window_width: u32,
    pub window_height: u32,

    /// Extra command-line switches appended to the hardening set.
    pub extra_args: Vec<String>,

    /// Per-protocol-request deadline in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            user_data_dir: None,
            executable: None,
            window_width: 1440,
            window_height: 900,
            extra_args: Vec::new(),
            request_timeout_ms: 30_000,
        }
    }
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set headless mode.
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Builder: set the persistent profile directory.
    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    /// Builder: set the browser executable.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Switches that keep automated sessions close to a human profile.
    pub fn hardening_args(&self) -> Vec<String> {
        let mut args = vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-infobars".to_string(),
            "--password-store=basic".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_headful() {
        let options = LaunchOptions::default();
        assert!(!options.headless);
        assert!(options.user_data_dir.is_none());
    }

    #[test]
    fn hardening_args_keep_extras() {
        let options = LaunchOptions::new().headless(true);
        let mut options = options;
        options.extra_args.push("--lang=en-US".to_string());
        let args = options.hardening_args();
        assert!(args.iter().any(|a| a.contains("AutomationControlled")));
        assert!(args.contains(&"--lang=en-US".to_string()));
    }
}
