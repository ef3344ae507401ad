//! Wordcast Common Utilities
//!
//! Shared infrastructure for all Wordcast crates:
//! - Error kinds and result aliases
//! - Tracing/logging initialization
//! - Configuration loading
//! - External tool probing

pub mod config;
pub mod error;
pub mod logging;
pub mod process;

pub use config::*;
pub use error::*;
