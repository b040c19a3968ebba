//! Top-level error types crossing the CLI boundary.
//!
//! Pipeline stages report through [`crate::bundler::Error`]; this layer
//! only adds argument validation failures and the catch-alls the binary
//! entry point prints before exiting non-zero.

use thiserror::Error;

/// Result type alias for CLI-facing operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Error surface of the packager binary
#[derive(Error, Debug)]
pub enum BundlerError {
    /// Argument validation failures
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors outside the pipeline stages
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failures from the packaging pipeline itself
    #[error("{0}")]
    Pipeline(#[from] crate::bundler::Error),
}

/// Argument-level errors, raised before any pipeline work starts
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}
