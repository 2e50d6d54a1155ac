//! Deterministic in-memory driver used for tests and offline development.
//!
//! Mirrors the role of the mock provider in the oracle crate: behavior is
//! scripted per selector candidate, every operation is recorded, and tab
//! topology changes can be attached to click outcomes so branching
//! policies can be exercised without a browser.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::DriverError;
use crate::port::{BrowserSession, PageDriver, TabInfo};
use trail_types::SelectorCandidate;

/// Minimal valid 1x1 transparent PNG, returned by scripted screenshots.
const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Scripted result of one element interaction.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// The interaction succeeds.
    Succeed,
    /// The interaction succeeds and a new tab opens at the given URL.
    SucceedOpensTab(String),
    /// The interaction fails with the given driver error.
    Fail(DriverError),
    /// The interaction never returns (exercises executor timeouts).
    Hang,
}

/// Per-page scripted behavior.
#[derive(Debug, Default)]
pub struct ScriptedBehavior {
    /// Outcomes per candidate (keyed by `SelectorCandidate::describe`),
    /// consumed front to back; missing entries succeed.
    pub interaction_outcomes: HashMap<String, VecDeque<ScriptedOutcome>>,
    /// Raw element payloads handed out by successive captures; the last
    /// one is reused once the queue runs dry.
    pub element_payloads: VecDeque<serde_json::Value>,
    /// Number of upcoming screenshots that fail with a gone page.
    pub capture_failures: u32,
}

struct PageState {
    url: String,
    title: String,
    behavior: ScriptedBehavior,
    last_payload: Option<serde_json::Value>,
    ops: Vec<String>,
}

/// In-memory page with scripted interaction outcomes.
pub struct ScriptedPage {
    state: Mutex<PageState>,
    tabs: Arc<Mutex<Vec<TabInfo>>>,
    tab_slot: Mutex<Option<usize>>,
}

impl ScriptedPage {
    fn new(tabs: Arc<Mutex<Vec<TabInfo>>>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                title: String::new(),
                behavior: ScriptedBehavior::default(),
                last_payload: None,
                ops: Vec::new(),
            }),
            tabs,
            tab_slot: Mutex::new(None),
        })
    }

    /// Queue one capture's raw element payload.
    pub fn queue_elements(&self, payload: serde_json::Value) {
        self.state.lock().behavior.element_payloads.push_back(payload);
    }

    /// Script the next outcome for a candidate.
    pub fn script_interaction(&self, candidate: &SelectorCandidate, outcome: ScriptedOutcome) {
        self.state
            .lock()
            .behavior
            .interaction_outcomes
            .entry(candidate.describe())
            .or_default()
            .push_back(outcome);
    }

    /// Make the next `n` screenshots fail as if the page were closed.
    pub fn fail_captures(&self, n: u32) {
        self.state.lock().behavior.capture_failures = n;
    }

    /// Every operation performed on this page, in order.
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().ops.clone()
    }

    fn record(&self, op: String) {
        self.state.lock().ops.push(op);
    }

    fn take_outcome(&self, candidate: &SelectorCandidate) -> ScriptedOutcome {
        self.state
            .lock()
            .behavior
            .interaction_outcomes
            .get_mut(&candidate.describe())
            .and_then(|queue| queue.pop_front())
            .unwrap_or(ScriptedOutcome::Succeed)
    }

    async fn apply_outcome(
        &self,
        candidate: &SelectorCandidate,
        op: &str,
    ) -> Result<(), DriverError> {
        self.record(format!("{op} {}", candidate.describe()));
        match self.take_outcome(candidate) {
            ScriptedOutcome::Succeed => Ok(()),
            ScriptedOutcome::SucceedOpensTab(url) => {
                self.tabs.lock().push(TabInfo {
                    title: String::new(),
                    url,
                });
                Ok(())
            }
            ScriptedOutcome::Fail(err) => Err(err),
            ScriptedOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    fn register_tab(&self, url: &str) {
        if url == "about:blank" {
            return;
        }
        let mut tabs = self.tabs.lock();
        let mut slot = self.tab_slot.lock();
        match *slot {
            Some(index) => tabs[index].url = url.to_string(),
            None => {
                tabs.push(TabInfo {
                    url: url.to_string(),
                    title: String::new(),
                });
                *slot = Some(tabs.len() - 1);
            }
        }
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {url}"));
        self.state.lock().url = url.to_string();
        self.register_tab(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().title.clone())
    }

    async fn evaluate(&self, _expression: &str) -> Result<serde_json::Value, DriverError> {
        let mut state = self.state.lock();
        if let Some(payload) = state.behavior.element_payloads.pop_front() {
            state.last_payload = Some(payload.clone());
            return Ok(payload);
        }
        Ok(state
            .last_payload
            .clone()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let mut state = self.state.lock();
        if state.behavior.capture_failures > 0 {
            state.behavior.capture_failures -= 1;
            return Err(DriverError::PageGone("scripted capture failure".into()));
        }
        state.ops.push("screenshot".to_string());
        Ok(PNG_1X1.to_vec())
    }

    async fn click(&self, candidate: &SelectorCandidate) -> Result<(), DriverError> {
        self.apply_outcome(candidate, "click").await
    }

    async fn fill(&self, candidate: &SelectorCandidate, text: &str) -> Result<(), DriverError> {
        self.apply_outcome(candidate, &format!("fill[{text}]")).await
    }

    async fn scroll_by(&self, dx: i32, dy: i32) -> Result<(), DriverError> {
        self.record(format!("scroll {dx},{dy}"));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.record(format!("press {key}"));
        Ok(())
    }
}

/// In-memory session: hands out scripted pages, tracks tab topology.
pub struct ScriptedSession {
    tabs: Arc<Mutex<Vec<TabInfo>>>,
    prepared: Mutex<VecDeque<Arc<ScriptedPage>>>,
    opened: Mutex<Vec<Arc<ScriptedPage>>>,
    closed: AtomicBool,
}

impl ScriptedSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tabs: Arc::new(Mutex::new(Vec::new())),
            prepared: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Create a page wired to this session's tab list and enqueue it for
    /// the next `open_page` call.
    pub fn prepare_page(&self) -> Arc<ScriptedPage> {
        let page = ScriptedPage::new(self.tabs.clone());
        self.prepared.lock().push_back(page.clone());
        page
    }

    /// Add a tab out of band (e.g. a pre-existing tab).
    pub fn push_tab(&self, url: impl Into<String>) {
        self.tabs.lock().push(TabInfo {
            url: url.into(),
            title: String::new(),
        });
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Pages handed out so far.
    pub fn opened_pages(&self) -> Vec<Arc<ScriptedPage>> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>, DriverError> {
        let page = self
            .prepared
            .lock()
            .pop_front()
            .unwrap_or_else(|| ScriptedPage::new(self.tabs.clone()));
        self.opened.lock().push(page.clone());
        Ok(page)
    }

    async fn tabs(&self) -> Result<Vec<TabInfo>, DriverError> {
        Ok(self.tabs.lock().clone())
    }

    async fn adopt_latest_page(&self) -> Result<Arc<dyn PageDriver>, DriverError> {
        let page = self
            .opened
            .lock()
            .last()
            .cloned()
            .ok_or_else(|| DriverError::PageGone("no open pages".to_string()))?;
        Ok(page)
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_click_outcomes_are_consumed_in_order() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        let candidate = SelectorCandidate::DomId {
            css: "#go".to_string(),
        };

        page.script_interaction(
            &candidate,
            ScriptedOutcome::Fail(DriverError::NotFound("gone".into())),
        );
        page.script_interaction(&candidate, ScriptedOutcome::Succeed);

        assert!(page.click(&candidate).await.is_err());
        assert!(page.click(&candidate).await.is_ok());
        // Unscripted candidates default to success.
        assert!(page
            .click(&SelectorCandidate::Coordinates { x: 1, y: 1 })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn tab_opening_outcome_mutates_topology() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.navigate("https://a.example").await.unwrap();

        let candidate = SelectorCandidate::Text {
            text: "Open".to_string(),
        };
        page.script_interaction(
            &candidate,
            ScriptedOutcome::SucceedOpensTab("https://pop.example".to_string()),
        );
        page.click(&candidate).await.unwrap();

        let tabs = session.tabs().await.unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[1].url, "https://pop.example");
    }

    #[tokio::test]
    async fn capture_failures_then_recover() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.fail_captures(1);
        assert!(page.screenshot().await.is_err());
        assert!(page.screenshot().await.is_ok());
    }

    #[tokio::test]
    async fn element_payload_queue_reuses_last() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.queue_elements(serde_json::json!([{"role": "button"}]));

        let first = page.evaluate("collect").await.unwrap();
        let second = page.evaluate("collect").await.unwrap();
        assert_eq!(first, second);
    }
}
