//! Tab change monitoring.
//!
//! Snapshots are taken immediately before an action and again after a
//! successful one; the comparison lives only long enough to produce a
//! [`TabDelta`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use browser_port::{BrowserSession, DriverError};
use trail_types::TabSnapshot;

/// What to do when an action opens a new tab.
///
/// Terminating is the default: cross-tab continuation multiplies
/// state-tracking complexity, and most instructions are satisfied by the
/// action that triggered the tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabPolicy {
    /// End the episode as completed with a tab-branch note.
    #[default]
    Terminate,
    /// Switch to the newest tab and continue the loop there.
    Follow,
}

/// Observes the session's tab topology around action execution.
pub struct TabWatcher {
    session: Arc<dyn BrowserSession>,
}

impl TabWatcher {
    pub fn new(session: Arc<dyn BrowserSession>) -> Self {
        Self { session }
    }

    /// Current topology; `about:blank` tabs are excluded by the session.
    pub async fn snapshot(&self) -> Result<TabSnapshot, DriverError> {
        let tabs = self.session.tabs().await?;
        let snapshot = TabSnapshot::new(tabs.into_iter().map(|t| t.url));
        Ok(snapshot)
    }

    /// Log a detected branch; kept here so both policies report the same
    /// shape.
    pub fn report_branch(delta: &trail_types::TabDelta) {
        info!(new_tabs = delta.new_urls.len(), urls = ?delta.new_urls, "new tab detected");
    }
}
