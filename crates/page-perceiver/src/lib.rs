//! Page perception: element descriptor building and state capture.
//!
//! [`PagePerceiver`] turns raw page content into a stable, ranked set of
//! interactive element descriptors plus a screenshot, and projects the
//! descriptor set into the bounded summary the oracle consumes. The
//! enumeration pass is a pure read; it never mutates the page.

pub mod annotate;
pub mod collect;
pub mod errors;
pub mod perceiver;

pub use annotate::annotate_screenshot;
pub use collect::RawElement;
pub use errors::PerceiverError;
pub use perceiver::{summarize, PageCapture, PagePerceiver, PerceiverConfig};
