//! Selector resolver: ranked targeting-strategy chains per element.
//!
//! For one captured element this crate produces a priority-ordered,
//! deduplicated list of independent ways to re-locate it. Each candidate
//! is self-contained, so an action can be constructed against it without
//! re-querying the page.
//!
//! Chain order is a design decision, not an accident: coordinates captured
//! at decision time outrank the semantic strategies because aria metadata
//! is frequently stale or duplicated across near-identical elements, while
//! the layout rarely reflows inside the short capture-to-execute window.

mod planner;

pub use planner::{clean_name, ChainPlanner};
