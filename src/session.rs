//! CDP-backed session factory for the orchestrator.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use browser_port::{BrowserSession, CdpBrowser, DriverError, LaunchOptions};
use episode_runner::{SessionFactory, WorkerSpec};

use crate::config::BrowserSettings;

/// Launches one persistent-profile Chromium per worker.
pub struct CdpSessionFactory {
    settings: BrowserSettings,
}

impl CdpSessionFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for CdpSessionFactory {
    async fn create(&self, spec: &WorkerSpec) -> Result<Arc<dyn BrowserSession>, DriverError> {
        std::fs::create_dir_all(&spec.profile_dir)
            .map_err(|e| DriverError::Launch(format!("profile dir: {e}")))?;

        let mut options = LaunchOptions::new()
            .headless(self.settings.headless)
            .user_data_dir(&spec.profile_dir);
        options.window_width = self.settings.window_width;
        options.window_height = self.settings.window_height;
        if let Some(executable) = &self.settings.executable {
            options = options.executable(executable);
        }

        info!(worker = %spec.id, profile = %spec.profile_dir.display(), "launching session");
        let browser = CdpBrowser::launch(&options).await?;
        Ok(Arc::new(browser))
    }
}
