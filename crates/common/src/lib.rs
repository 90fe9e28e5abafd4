//! SceneReel Common Utilities
//!
//! Shared infrastructure for all SceneReel crates:
//! - Error types and result aliases
//! - Recording clock used to anchor a generate run
//! - Human-readable size labels and output file naming
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use format::*;
