//! Error types for pipeline operations.
//!
//! Provides contextual error chaining via the [`Context`] trait, filesystem
//! errors with path context via [`ErrorExt`], and a `bail!` macro for early
//! returns with formatted messages.

use std::{fmt::Display, io, path::PathBuf};
use thiserror::Error as DeriveError;

/// Errors returned by the packaging pipeline.
///
/// Covers every fatal condition the pipeline can hit: unresolved binary
/// dependencies, archive extraction failures, architecture mismatches,
/// packaging-tool failures, and plain I/O or external-command errors.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "copying binary")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Child process execution error.
    ///
    /// Used when an external command cannot be spawned at all
    /// (hdiutil, sips, iconutil, osascript, lipo, pyinstaller).
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking directory (archive search, .app copy).
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// HTTP client error (downloading the q binary).
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL parsing error (remote locator).
    #[error("{0}")]
    UrlParse(#[from] url::ParseError),

    /// No usable q binary found through any resolution path.
    #[error("unresolved dependency: {0}")]
    UnresolvedDependency(String),

    /// Expected executable absent inside the downloaded archive.
    #[error("no executable named \"q\" found in {archive}")]
    ExtractionFailed {
        /// The archive that was searched
        archive: String,
    },

    /// Resolved binary does not report the host architecture.
    #[error(
        "binary {binary} does not match host architecture {host}; reported architectures: {reported}"
    )]
    ArchMismatch {
        /// Path of the inspected binary
        binary: PathBuf,
        /// Host architecture identifier
        host: String,
        /// Raw architecture report from the binary
        reported: String,
    },

    /// Packaging tool ran but produced no bundle at either expected path.
    #[error("packaging produced no .app bundle for {product}")]
    PackagingFailed {
        /// Product name used for the bundle
        product: String,
    },

    /// Installer assembly invoked before a bundle exists.
    #[error("no .app bundle found for {product}; build the app bundle first")]
    MissingBundle {
        /// Product name used for the bundle
        product: String,
    },

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the pipeline's Error
/// type. Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// The `context` should be a present-tense verb phrase describing the
/// operation, e.g., "reading file", "creating staging directory".
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns
/// immediately.
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
