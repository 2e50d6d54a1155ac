//! Browser ports for the trajectory engine.
//!
//! Everything above this crate talks to the browser through two traits:
//! [`BrowserSession`] (tab topology, page creation, teardown) and
//! [`PageDriver`] (navigation, evaluation, input dispatch, screenshots).
//! The production implementation drives Chromium over CDP via
//! `chromiumoxide`; [`scripted`] provides a deterministic in-memory driver
//! for tests and offline development.

pub mod cdp;
pub mod errors;
pub mod launch;
pub mod port;
pub mod scripted;

pub use cdp::{CdpBrowser, CdpPage};
pub use errors::DriverError;
pub use launch::LaunchOptions;
pub use port::{BrowserSession, PageDriver, TabInfo};
pub use scripted::{ScriptedBehavior, ScriptedOutcome, ScriptedPage, ScriptedSession};
