//! Packaging pipeline for the Amazon Q CLI chat GUI.
//!
//! Turns the `q` CLI dependency plus a thin GUI front-end into a
//! self-contained macOS .app bundle and a drag-to-install DMG installer.
//! Usable both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
