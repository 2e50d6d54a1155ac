//! The session and page traits everything above the browser layer uses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::DriverError;
use trail_types::SelectorCandidate;

/// One open tab as seen by the tab monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub url: String,
    pub title: String,
}

/// One browser process/profile owned by exactly one worker.
///
/// Acquired at worker start and released through [`BrowserSession::close`]
/// on every exit path; a session is never shared between workers.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a fresh page (tab) in this session.
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>, DriverError>;

    /// All currently open tabs, `about:blank` excluded.
    async fn tabs(&self) -> Result<Vec<TabInfo>, DriverError>;

    /// Hand over the most recently opened tab as a driver, for the
    /// follow-tab policy.
    async fn adopt_latest_page(&self) -> Result<Arc<dyn PageDriver>, DriverError>;

    /// Tear the session down. Idempotent.
    async fn close(&self) -> Result<(), DriverError>;
}

/// Operations on one page.
///
/// Element-targeting operations take a realized [`SelectorCandidate`]; the
/// driver maps each candidate kind onto the protocol without re-ranking or
/// retrying — fallback policy lives in the executor.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, DriverError>;

    /// Viewport screenshot as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Click the element the candidate resolves to.
    async fn click(&self, candidate: &SelectorCandidate) -> Result<(), DriverError>;

    /// Focus the element the candidate resolves to, clear it and type text.
    async fn fill(&self, candidate: &SelectorCandidate, text: &str) -> Result<(), DriverError>;

    async fn scroll_by(&self, dx: i32, dy: i32) -> Result<(), DriverError>;

    async fn press_key(&self, key: &str) -> Result<(), DriverError>;
}
