//! Trailforge: browser trajectory generation for web-acting agents.
//!
//! The workspace crates do the heavy lifting; this crate wires them into
//! a CLI: configuration, logging, instruction loading and worker launch.

pub mod config;
pub mod session;

pub use config::{AccountConfig, AppConfig, BrowserSettings, OracleSettings};
pub use session::CdpSessionFactory;
