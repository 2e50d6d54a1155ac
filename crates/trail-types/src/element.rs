//! Capture-time element descriptors and their ranked targeting strategies.

use serde::{Deserialize, Serialize};

/// Viewport-relative bounding box of one interactive element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, used for coordinate targeting and hit-testing.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Raw attributes captured from the element at enumeration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttributes {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class_name: String,
    /// The `type` attribute (inputs, buttons).
    #[serde(default)]
    pub input_type: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub selected: Option<bool>,
}

/// Targeting strategy families, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Stable DOM id.
    DomId,
    /// Absolute viewport coordinates of the bounding-box center.
    Coordinates,
    /// ARIA role plus accessible name.
    RoleName,
    /// Accessible label.
    Label,
    /// Visible text content.
    Text,
    /// Combined tag + class CSS path.
    CssPath,
}

impl SelectorKind {
    /// Stable name used in logs and persisted attempts.
    pub fn name(&self) -> &'static str {
        match self {
            SelectorKind::DomId => "id",
            SelectorKind::Coordinates => "coordinates",
            SelectorKind::RoleName => "role_name",
            SelectorKind::Label => "label",
            SelectorKind::Text => "text",
            SelectorKind::CssPath => "css_combined",
        }
    }

    /// Chain rank; lower is tried first.
    pub fn rank(&self) -> u8 {
        match self {
            SelectorKind::DomId => 0,
            SelectorKind::Coordinates => 1,
            SelectorKind::RoleName => 2,
            SelectorKind::Label => 3,
            SelectorKind::Text => 4,
            SelectorKind::CssPath => 5,
        }
    }
}

/// One self-contained way to re-locate an element.
///
/// Every variant carries everything needed to act on the element without
/// re-querying the page, so a candidate stays valid after the descriptor
/// set that produced it has been superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectorCandidate {
    DomId { css: String },
    Coordinates { x: i32, y: i32 },
    RoleName { role: String, name: String },
    Label { label: String },
    Text { text: String },
    CssPath { css: String },
}

impl SelectorCandidate {
    pub fn kind(&self) -> SelectorKind {
        match self {
            SelectorCandidate::DomId { .. } => SelectorKind::DomId,
            SelectorCandidate::Coordinates { .. } => SelectorKind::Coordinates,
            SelectorCandidate::RoleName { .. } => SelectorKind::RoleName,
            SelectorCandidate::Label { .. } => SelectorKind::Label,
            SelectorCandidate::Text { .. } => SelectorKind::Text,
            SelectorCandidate::CssPath { .. } => SelectorKind::CssPath,
        }
    }

    /// Human-readable form used in error logs and oracle retry context.
    pub fn describe(&self) -> String {
        match self {
            SelectorCandidate::DomId { css } => format!("id:{css}"),
            SelectorCandidate::Coordinates { x, y } => format!("coordinates:{x},{y}"),
            SelectorCandidate::RoleName { role, name } => format!("role:{role}[name={name}]"),
            SelectorCandidate::Label { label } => format!("label:{label}"),
            SelectorCandidate::Text { text } => format!("text:{text}"),
            SelectorCandidate::CssPath { css } => format!("css:{css}"),
        }
    }
}

/// Normalized, capture-time snapshot of one interactive page element.
///
/// Rebuilt on every capture; never mutated afterwards, only superseded by
/// the next capture's set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Dense integer assigned in traversal order, stable within one capture.
    pub annotation_id: u32,
    pub role: String,
    pub name: String,
    pub bounding_box: BoundingBox,
    pub tag_name: String,
    pub attributes: ElementAttributes,
    /// Priority-ordered, deduplicated targeting strategies.
    pub selector_candidates: Vec<SelectorCandidate>,
}

impl ElementDescriptor {
    /// Look up a descriptor in a capture set by annotation id.
    pub fn find(descriptors: &[ElementDescriptor], annotation_id: u32) -> Option<&ElementDescriptor> {
        descriptors.iter().find(|d| d.annotation_id == annotation_id)
    }
}

/// Bounded projection of a descriptor sent to the oracle.
///
/// The full descriptor set (candidates, attributes) is too large to ship
/// on every turn; the oracle only needs enough to pick a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummaryEntry {
    pub annotation_id: u32,
    pub role: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
}

impl From<&ElementDescriptor> for StateSummaryEntry {
    fn from(descriptor: &ElementDescriptor) -> Self {
        let (x, y) = descriptor.bounding_box.center();
        Self {
            annotation_id: descriptor.annotation_id,
            role: descriptor.role.clone(),
            name: descriptor.name.clone(),
            x,
            y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_center() {
        let bbox = BoundingBox::new(10, 20, 100, 40);
        assert_eq!(bbox.center(), (60, 40));
    }

    #[test]
    fn selector_kind_ranks_are_chain_order() {
        let kinds = [
            SelectorKind::DomId,
            SelectorKind::Coordinates,
            SelectorKind::RoleName,
            SelectorKind::Label,
            SelectorKind::Text,
            SelectorKind::CssPath,
        ];
        for window in kinds.windows(2) {
            assert!(window[0].rank() < window[1].rank());
        }
    }

    #[test]
    fn candidate_serialization_is_tagged() {
        let candidate = SelectorCandidate::RoleName {
            role: "button".to_string(),
            name: "Create".to_string(),
        };
        let json = serde_json::to_string(&candidate).unwrap();
        assert!(json.contains("\"kind\":\"role_name\""));

        let back: SelectorCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candidate);
    }

    #[test]
    fn summary_entry_projects_center() {
        let descriptor = ElementDescriptor {
            annotation_id: 3,
            role: "button".to_string(),
            name: "Create".to_string(),
            bounding_box: BoundingBox::new(0, 0, 80, 30),
            tag_name: "button".to_string(),
            attributes: ElementAttributes::default(),
            selector_candidates: Vec::new(),
        };
        let entry = StateSummaryEntry::from(&descriptor);
        assert_eq!(entry.annotation_id, 3);
        assert_eq!((entry.x, entry.y), (40, 15));
    }
}
