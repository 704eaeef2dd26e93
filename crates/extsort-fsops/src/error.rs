//! # Design
//!
//! - Provide structured, constant-message errors for the sort pipeline.
//! - Capture operation context (paths, keys) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Result type for sort operations.
pub type SortResult<T> = Result<T, SortError>;

/// Errors produced while sorting a directory tree.
#[derive(Debug, Error)]
pub enum SortError {
    /// The source root was missing or was not a directory.
    #[error("source root precondition failed")]
    Precondition {
        /// Source root supplied by the caller.
        path: PathBuf,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// A destination directory for a classification key could not be created.
    #[error("destination directory creation failed")]
    DirectoryCreation {
        /// Classification key the directory belongs to.
        key: String,
        /// Directory path that could not be created.
        path: PathBuf,
        /// Underlying IO error, shared by every task waiting on the key.
        source: Arc<io::Error>,
    },
    /// A single file failed to copy.
    #[error("file copy failed")]
    Copy {
        /// Source file that failed to copy.
        path: PathBuf,
        /// Destination path the copy targeted.
        destination: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// IO failures outside the per-file copy step.
    #[error("sort io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("sort walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// A spawned task panicked or was aborted before reporting.
    #[error("sort task join failure")]
    Join {
        /// Operation that owned the task.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl SortError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn join(operation: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Join { operation, source }
    }

    /// Render the error together with its source chain on a single line.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut rendered = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            current = cause.source();
        }
        rendered
    }
}
