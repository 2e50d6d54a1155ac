//! Tab snapshots and the delta that detects session branching.

use std::collections::BTreeSet;

/// Point-in-time view of the browser's open tabs.
///
/// Taken immediately before and after an action; lives only as long as the
/// comparison producing a [`TabDelta`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSnapshot {
    pub count: usize,
    pub urls: BTreeSet<String>,
}

impl TabSnapshot {
    pub fn new(urls: impl IntoIterator<Item = String>) -> Self {
        let urls: BTreeSet<String> = urls.into_iter().collect();
        Self {
            count: urls.len(),
            urls,
        }
    }

    pub fn empty() -> Self {
        Self {
            count: 0,
            urls: BTreeSet::new(),
        }
    }

    /// Compare against a later snapshot.
    ///
    /// `has_new_tabs` is a pure count comparison; `new_urls` is the exact
    /// set difference `after \ before`.
    pub fn delta(&self, after: &TabSnapshot) -> TabDelta {
        let new_urls: Vec<String> = after.urls.difference(&self.urls).cloned().collect();
        TabDelta {
            has_new_tabs: after.count > self.count,
            new_urls,
        }
    }
}

/// Result of comparing two tab snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabDelta {
    pub has_new_tabs: bool,
    pub new_urls: Vec<String>,
}
