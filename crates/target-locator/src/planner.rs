//! Chain construction and name cleaning.

use tracing::trace;
use trail_types::{BoundingBox, ElementAttributes, SelectorCandidate};

/// Builds selector-candidate chains for captured elements.
#[derive(Debug, Clone)]
pub struct ChainPlanner {
    /// Class names taken into the combined CSS path.
    max_classes: usize,
    /// Cleaned-name length cap before truncation.
    max_name_len: usize,
}

impl Default for ChainPlanner {
    fn default() -> Self {
        Self {
            max_classes: 3,
            max_name_len: 50,
        }
    }
}

impl ChainPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the ranked chain for one element:
    /// DOM id, bbox-center coordinates, role+name, label, text, CSS path.
    ///
    /// Candidates whose source data is missing are skipped; duplicates
    /// (identical realized candidates) are dropped, keeping the
    /// highest-priority occurrence.
    pub fn plan(
        &self,
        role: &str,
        raw_name: &str,
        bounding_box: BoundingBox,
        tag_name: &str,
        attributes: &ElementAttributes,
    ) -> Vec<SelectorCandidate> {
        let name = clean_name(raw_name, self.max_name_len);
        let mut chain = Vec::with_capacity(6);

        if !attributes.id.is_empty() {
            chain.push(SelectorCandidate::DomId {
                css: format!("#{}", attributes.id),
            });
        }

        let (cx, cy) = bounding_box.center();
        chain.push(SelectorCandidate::Coordinates { x: cx, y: cy });

        if !role.is_empty() && !name.is_empty() {
            chain.push(SelectorCandidate::RoleName {
                role: role.to_string(),
                name: name.clone(),
            });
        }

        if !name.is_empty() {
            chain.push(SelectorCandidate::Label {
                label: name.clone(),
            });
            chain.push(SelectorCandidate::Text { text: name });
        }

        if let Some(css) = self.css_path(tag_name, attributes) {
            chain.push(SelectorCandidate::CssPath { css });
        }

        let chain = dedup_chain(chain);
        trace!(candidates = chain.len(), role, "planned selector chain");
        chain
    }

    /// Combined tag + id + leading-classes CSS path; the weakest strategy.
    fn css_path(&self, tag_name: &str, attributes: &ElementAttributes) -> Option<String> {
        let mut css = String::new();
        if !tag_name.is_empty() {
            css.push_str(tag_name);
        }
        if !attributes.id.is_empty() {
            css.push('#');
            css.push_str(&attributes.id);
        }
        for class in attributes
            .class_name
            .split_whitespace()
            .filter(|c| is_css_safe(c))
            .take(self.max_classes)
        {
            css.push('.');
            css.push_str(class);
        }
        if css.is_empty() {
            None
        } else {
            Some(css)
        }
    }
}

/// Normalize a raw accessible name for use in semantic candidates.
///
/// Newlines and tabs become spaces, runs of three or more spaces collapse
/// to one, and overly long names are truncated with an ellipsis marker.
pub fn clean_name(raw: &str, max_len: usize) -> String {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '\n' | '\t' | '\r' => ' ',
            other => other,
        })
        .collect();

    while cleaned.contains("   ") {
        cleaned = cleaned.replace("   ", " ");
    }

    if cleaned.chars().count() > max_len {
        let keep: String = cleaned.chars().take(max_len.saturating_sub(3)).collect();
        cleaned = format!("{keep}...");
    }

    cleaned
}

/// Class tokens with CSS-hostile characters would produce selectors that
/// never match; skip them.
fn is_css_safe(class: &str) -> bool {
    !class.is_empty()
        && class
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn dedup_chain(chain: Vec<SelectorCandidate>) -> Vec<SelectorCandidate> {
    let mut deduped: Vec<SelectorCandidate> = Vec::with_capacity(chain.len());
    for candidate in chain {
        if !deduped.contains(&candidate) {
            deduped.push(candidate);
        }
    }
    deduped
}
