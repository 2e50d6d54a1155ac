//! Chromium DevTools Protocol implementation of the browser ports.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{classify_protocol_error, DriverError};
use crate::launch::LaunchOptions;
use crate::port::{BrowserSession, PageDriver, TabInfo};
use trail_types::SelectorCandidate;

fn map_cdp(err: chromiumoxide::error::CdpError) -> DriverError {
    classify_protocol_error(err.to_string())
}

/// One Chromium process plus the event handler that keeps it alive.
pub struct CdpBrowser {
    browser: Mutex<Browser>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

impl CdpBrowser {
    /// Launch a browser for one worker.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .request_timeout(Duration::from_millis(options.request_timeout_ms));

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(exec) = &options.executable {
            builder = builder.chrome_executable(exec);
        }
        for arg in options.hardening_args() {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(DriverError::Launch)?;

        info!(headless = options.headless, "launching browser");
        let (browser, mut handler) = Browser::launch(config).await.map_err(map_cdp)?;

        // The handler stream must be polled for the connection to make
        // progress; it ends when the browser process goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!(%err, "cdp handler stopped");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler_task: Mutex::new(Some(handler_task)),
        })
    }
}

#[async_trait]
impl BrowserSession for CdpBrowser {
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>, DriverError> {
        let browser = self.browser.lock().await;
        let page = browser.new_page("about:blank").await.map_err(map_cdp)?;
        Ok(Arc::new(CdpPage { page }))
    }

    async fn tabs(&self) -> Result<Vec<TabInfo>, DriverError> {
        let browser = self.browser.lock().await;
        let pages = browser.pages().await.map_err(map_cdp)?;

        let mut tabs = Vec::with_capacity(pages.len());
        for page in pages {
            // A tab that refuses to answer is skipped rather than failing
            // the whole snapshot.
            let url = match page.url().await {
                Ok(Some(url)) => url,
                Ok(None) => continue,
                Err(err) => {
                    debug!(%err, "skipping unresponsive tab");
                    continue;
                }
            };
            if url == "about:blank" {
                continue;
            }
            let title = page.get_title().await.ok().flatten().unwrap_or_default();
            tabs.push(TabInfo { url, title });
        }
        Ok(tabs)
    }

    async fn adopt_latest_page(&self) -> Result<Arc<dyn PageDriver>, DriverError> {
        let browser = self.browser.lock().await;
        let pages = browser.pages().await.map_err(map_cdp)?;
        let page = pages
            .into_iter()
            .last()
            .ok_or_else(|| DriverError::PageGone("no open pages".to_string()))?;
        page.bring_to_front().await.map_err(map_cdp)?;
        Ok(Arc::new(CdpPage { page }))
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            debug!(%err, "browser close reported an error");
        }
        if let Err(err) = browser.wait().await {
            debug!(%err, "browser process wait reported an error");
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}

/// One CDP page.
pub struct CdpPage {
    page: Page,
}

impl CdpPage {
    async fn click_point(&self, x: i32, y: i32) -> Result<(), DriverError> {
        let point = Point {
            x: x as f64,
            y: y as f64,
        };
        self.page.click(point).await.map_err(map_cdp)?;
        Ok(())
    }

    async fn click_css(&self, css: &str) -> Result<(), DriverError> {
        let element = self.page.find_element(css).await.map_err(map_cdp)?;
        element.click().await.map_err(map_cdp)?;
        Ok(())
    }

    /// Resolve a semantic candidate to its current center point.
    async fn locate_center(&self, candidate: &SelectorCandidate) -> Result<(i32, i32), DriverError> {
        let js = locate_js(candidate)?;
        let value = self.evaluate(&js).await?;
        let (x, y) = match (value.get("x"), value.get("y")) {
            (Some(x), Some(y)) => (x.as_f64(), y.as_f64()),
            _ => (None, None),
        };
        match (x, y) {
            (Some(x), Some(y)) => Ok((x as i32, y as i32)),
            _ => Err(DriverError::NotFound(candidate.describe())),
        }
    }

    async fn focus_candidate(&self, candidate: &SelectorCandidate) -> Result<(), DriverError> {
        match candidate {
            SelectorCandidate::DomId { css } | SelectorCandidate::CssPath { css } => {
                let element = self.page.find_element(css.as_str()).await.map_err(map_cdp)?;
                element.click().await.map_err(map_cdp)?;
            }
            SelectorCandidate::Coordinates { x, y } => {
                self.click_point(*x, *y).await?;
            }
            _ => {
                let (x, y) = self.locate_center(candidate).await?;
                self.click_point(x, y).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!(url, "navigating");
        self.page.goto(url).await.map_err(map_cdp)?;
        self.page.wait_for_navigation().await.map_err(map_cdp)?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(map_cdp)?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(map_cdp)?
            .unwrap_or_default())
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, DriverError> {
        let result = self.page.evaluate(expression).await.map_err(map_cdp)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await
            .map_err(map_cdp)
    }

    async fn click(&self, candidate: &SelectorCandidate) -> Result<(), DriverError> {
        match candidate {
            SelectorCandidate::DomId { css } | SelectorCandidate::CssPath { css } => {
                self.click_css(css).await
            }
            SelectorCandidate::Coordinates { x, y } => self.click_point(*x, *y).await,
            _ => {
                let (x, y) = self.locate_center(candidate).await?;
                self.click_point(x, y).await
            }
        }
    }

    async fn fill(&self, candidate: &SelectorCandidate, text: &str) -> Result<(), DriverError> {
        self.focus_candidate(candidate).await?;

        // Clear whatever was focused, then insert through the input domain
        // so frameworks see composition-like input events.
        self.evaluate(
            "(() => { const el = document.activeElement; \
             if (el && 'value' in el) { el.value = ''; } })()",
        )
        .await?;

        self.page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(map_cdp)?;
        Ok(())
    }

    async fn scroll_by(&self, dx: i32, dy: i32) -> Result<(), DriverError> {
        self.evaluate(&format!("window.scrollBy({dx}, {dy})")).await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key)
            .text(key_text(key))
            .build()
            .map_err(DriverError::Protocol)?;
        self.page.execute(down).await.map_err(map_cdp)?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .build()
            .map_err(DriverError::Protocol)?;
        self.page.execute(up).await.map_err(map_cdp)?;
        Ok(())
    }
}

/// Printable payload for single-character keys; named keys carry none.
fn key_text(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_string(),
        _ => {
            if key == "Enter" {
                "\r".to_string()
            } else {
                String::new()
            }
        }
    }
}

/// Build a locating expression for semantic candidates.
///
/// Returns the center of the first visible match or `null`. The matching
/// rules mirror descriptor capture: explicit role attribute or implicit
/// role by tag, accessible name from aria-label/text/title/placeholder.
fn locate_js(candidate: &SelectorCandidate) -> Result<String, DriverError> {
    let (mode, arg_a, arg_b) = match candidate {
        SelectorCandidate::RoleName { role, name } => ("role", role.as_str(), name.as_str()),
        SelectorCandidate::Label { label } => ("label", label.as_str(), ""),
        SelectorCandidate::Text { text } => ("text", text.as_str(), ""),
        other => {
            return Err(DriverError::Protocol(format!(
                "candidate {} is not locatable via script",
                other.describe()
            )))
        }
    };

    let mode = serde_json::to_string(mode).map_err(|e| DriverError::Protocol(e.to_string()))?;
    let arg_a = serde_json::to_string(arg_a).map_err(|e| DriverError::Protocol(e.to_string()))?;
    let arg_b = serde_json::to_string(arg_b).map_err(|e| DriverError::Protocol(e.to_string()))?;

    Ok(format!(
        r#"(() => {{
  const mode = {mode};
  const argA = {arg_a};
  const argB = {arg_b};
  const IMPLICIT = {{ a: 'link', button: 'button', input: 'textbox', textarea: 'textbox', select: 'combobox', option: 'option' }};
  const accName = (el) =>
    (el.getAttribute('aria-label') || el.textContent || el.getAttribute('title') ||
     el.getAttribute('placeholder') || el.value || '').trim();
  const visible = (el) => {{
    const rect = el.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) return false;
    const style = window.getComputedStyle(el);
    return style.display !== 'none' && style.visibility !== 'hidden' && parseFloat(style.opacity) > 0;
  }};
  const roleOf = (el) => el.getAttribute('role') || IMPLICIT[el.tagName.toLowerCase()] || '';
  for (const el of document.querySelectorAll('*')) {{
    if (!visible(el)) continue;
    let hit = false;
    if (mode === 'role') {{
      hit = roleOf(el) === argA && accName(el) === argB;
    }} else if (mode === 'label') {{
      hit = (el.getAttribute('aria-label') || '').trim() === argA;
    }} else {{
      hit = accName(el) === argA;
    }}
    if (hit) {{
      const rect = el.getBoundingClientRect();
      return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};
    }}
  }}
  return null;
}})()"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_js_rejects_non_semantic_candidates() {
        let err = locate_js(&SelectorCandidate::Coordinates { x: 1, y: 2 });
        assert!(err.is_err());
    }

    #[test]
    fn locate_js_embeds_escaped_needles() {
        let js = locate_js(&SelectorCandidate::Text {
            text: "It's \"on\"".to_string(),
        })
        .unwrap();
        assert!(js.contains("It's \\\"on\\\""));
    }

    #[test]
    fn key_text_for_named_and_char_keys() {
        assert_eq!(key_text("a"), "a");
        assert_eq!(key_text("Enter"), "\r");
        assert_eq!(key_text("ArrowDown"), "");
    }
}
