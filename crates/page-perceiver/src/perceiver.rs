//! Page state collection: screenshot + descriptor set + oracle summary.

use std::sync::Arc;
use tracing::{debug, warn};

use browser_port::PageDriver;
use target_locator::ChainPlanner;
use trail_types::{BoundingBox, ElementAttributes, ElementDescriptor, StateSummaryEntry};

use crate::collect::{RawElement, COLLECT_ELEMENTS_JS};
use crate::errors::PerceiverError;

/// Tunables for one perceiver.
#[derive(Debug, Clone)]
pub struct PerceiverConfig {
    /// Hard cap on descriptors per capture; anything beyond is dropped
    /// (and logged) to bound oracle payloads.
    pub max_elements: usize,
}

impl Default for PerceiverConfig {
    fn default() -> Self {
        Self { max_elements: 500 }
    }
}

/// One capture: screenshot plus the descriptor set taken in the same pass.
#[derive(Debug, Clone)]
pub struct PageCapture {
    /// PNG bytes of the viewport.
    pub screenshot: Vec<u8>,
    pub descriptors: Vec<ElementDescriptor>,
}

/// Captures normalized page state through a [`PageDriver`].
pub struct PagePerceiver {
    driver: Arc<dyn PageDriver>,
    planner: ChainPlanner,
    config: PerceiverConfig,
}

impl PagePerceiver {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            planner: ChainPlanner::new(),
            config: PerceiverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PerceiverConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the underlying driver after a page was recreated.
    pub fn set_driver(&mut self, driver: Arc<dyn PageDriver>) {
        self.driver = driver;
    }

    /// Capture the current page: screenshot first (cheapest failure probe
    /// for a gone page), then the element enumeration pass.
    pub async fn capture(&self) -> Result<PageCapture, PerceiverError> {
        let screenshot = self.driver.screenshot().await?;

        let value = self.driver.evaluate(COLLECT_ELEMENTS_JS).await?;
        let raw: Vec<RawElement> = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)
                .map_err(|e| PerceiverError::Collection(e.to_string()))?,
            other => {
                return Err(PerceiverError::Collection(format!(
                    "collection script returned non-array value: {other}"
                )))
            }
        };

        let total = raw.len();
        if total > self.config.max_elements {
            warn!(
                total,
                kept = self.config.max_elements,
                "element cap exceeded, truncating descriptor set"
            );
        }

        let descriptors: Vec<ElementDescriptor> = raw
            .into_iter()
            .take(self.config.max_elements)
            .enumerate()
            .map(|(index, raw)| self.build_descriptor(index as u32, raw))
            .collect();

        debug!(elements = descriptors.len(), "captured page state");
        Ok(PageCapture {
            screenshot,
            descriptors,
        })
    }

    fn build_descriptor(&self, annotation_id: u32, raw: RawElement) -> ElementDescriptor {
        let bounding_box = BoundingBox::new(raw.x, raw.y, raw.width, raw.height);
        let attributes = ElementAttributes {
            id: raw.id,
            class_name: raw.class_name,
            input_type: raw.input_type,
            href: raw.href,
            value: raw.value,
            disabled: raw.disabled,
            checked: raw.checked,
            selected: raw.selected,
        };
        let selector_candidates =
            self.planner
                .plan(&raw.role, &raw.name, bounding_box, &raw.tag_name, &attributes);

        ElementDescriptor {
            annotation_id,
            role: raw.role,
            name: target_locator::clean_name(&raw.name, 50),
            bounding_box,
            tag_name: raw.tag_name,
            attributes,
            selector_candidates,
        }
    }
}

/// Project descriptors into the bounded oracle summary.
pub fn summarize(descriptors: &[ElementDescriptor]) -> Vec<StateSummaryEntry> {
    descriptors.iter().map(StateSummaryEntry::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_port::ScriptedSession;
    use serde_json::json;
    use trail_types::SelectorKind;

    fn payload() -> serde_json::Value {
        json!([
            {
                "role": "button", "name": "Create",
                "x": 100, "y": 200, "width": 80, "height": 40,
                "tagName": "button", "id": "create-btn",
                "className": "btn", "type": "", "href": "", "value": "",
                "disabled": false, "checked": null, "selected": null
            },
            {
                "role": "textbox", "name": "Search",
                "x": 10, "y": 10, "width": 200, "height": 30,
                "tagName": "input", "id": "",
                "className": "", "type": "text", "href": "", "value": "",
                "disabled": false, "checked": null, "selected": null
            }
        ])
    }

    #[tokio::test]
    async fn capture_assigns_dense_annotation_ids() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.queue_elements(payload());

        let perceiver = PagePerceiver::new(page);
        let capture = perceiver.capture().await.unwrap();

        assert_eq!(capture.descriptors.len(), 2);
        assert_eq!(capture.descriptors[0].annotation_id, 0);
        assert_eq!(capture.descriptors[1].annotation_id, 1);
        assert!(!capture.screenshot.is_empty());

        // The id-bearing element leads its chain with the DOM id.
        assert_eq!(
            capture.descriptors[0].selector_candidates[0].kind(),
            SelectorKind::DomId
        );
        // The anonymous-but-named element starts at coordinates.
        assert_eq!(
            capture.descriptors[1].selector_candidates[0].kind(),
            SelectorKind::Coordinates
        );
    }

    #[tokio::test]
    async fn capture_surfaces_page_loss() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.fail_captures(1);

        let perceiver = PagePerceiver::new(page);
        let err = perceiver.capture().await.unwrap_err();
        assert!(err.is_page_unavailable());
    }

    #[tokio::test]
    async fn capture_rejects_non_array_payload() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.queue_elements(json!({"not": "an array"}));

        let perceiver = PagePerceiver::new(page);
        let err = perceiver.capture().await.unwrap_err();
        assert!(matches!(err, PerceiverError::Collection(_)));
    }

    #[tokio::test]
    async fn element_cap_truncates() {
        let many: Vec<serde_json::Value> = (0..10)
            .map(|i| {
                json!({
                    "role": "button", "name": format!("b{i}"),
                    "x": 0, "y": 0, "width": 20, "height": 20,
                    "tagName": "button", "id": "", "className": "",
                    "type": "", "href": "", "value": "",
                    "disabled": false, "checked": null, "selected": null
                })
            })
            .collect();
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.queue_elements(serde_json::Value::Array(many));

        let perceiver =
            PagePerceiver::new(page).with_config(PerceiverConfig { max_elements: 4 });
        let capture = perceiver.capture().await.unwrap();
        assert_eq!(capture.descriptors.len(), 4);
    }

    #[tokio::test]
    async fn summary_projection_is_bounded_shape() {
        let session = ScriptedSession::new();
        let page = session.prepare_page();
        page.queue_elements(payload());

        let perceiver = PagePerceiver::new(page);
        let capture = perceiver.capture().await.unwrap();
        let summary = summarize(&capture.descriptors);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].annotation_id, 0);
        assert_eq!(summary[0].role, "button");
        assert_eq!((summary[0].x, summary[0].y), (140, 220));
    }
}
