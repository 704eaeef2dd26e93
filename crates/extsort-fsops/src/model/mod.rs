//! Domain models for the sort pipeline.
//!
//! # Design
//! - Keep request/response types lightweight; entries and tasks are transient.
//! - Avoid embedding IO handles; callers supply paths.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Sentinel key assigned to files without a usable extension.
pub const NO_EXTENSION: &str = "no_extension";

/// Immutable inputs for a single sort run.
#[derive(Debug, Copy, Clone)]
pub struct SortRequest<'a> {
    /// Directory tree whose files are sorted.
    pub source_root: &'a Path,
    /// Directory receiving one subfolder per classification key.
    pub output_root: &'a Path,
    /// Descend into symlinked directories while scanning.
    pub follow_links: bool,
}

impl<'a> SortRequest<'a> {
    /// Build a request with default traversal options.
    #[must_use]
    pub const fn new(source_root: &'a Path, output_root: &'a Path) -> Self {
        Self {
            source_root,
            output_root,
            follow_links: false,
        }
    }

    /// Toggle descending into symlinked directories.
    #[must_use]
    pub const fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }
}

/// A regular file discovered while scanning the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    path: PathBuf,
}

impl FileEntry {
    pub(crate) const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the discovered file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Normalised extension used to group files into destination folders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassificationKey(String);

impl ClassificationKey {
    pub(crate) const fn new(value: String) -> Self {
        Self(value)
    }

    pub(crate) fn no_extension() -> Self {
        Self(NO_EXTENSION.to_string())
    }

    /// Key as a string slice, also the destination folder name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClassificationKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Pending unit of work pairing a discovered file with its key.
#[derive(Debug, Clone)]
pub(crate) struct CopyTask {
    pub(crate) entry: FileEntry,
    pub(crate) key: ClassificationKey,
}

/// Terminal state of a single copy.
#[derive(Debug)]
pub enum CopyOutcome {
    /// The file was copied.
    Copied {
        /// Source file.
        source: PathBuf,
        /// Resolved destination path.
        destination: PathBuf,
        /// Bytes written to the destination.
        bytes: u64,
    },
    /// The file could not be copied.
    Failed {
        /// Source file.
        source: PathBuf,
        /// Cause of the failure.
        error: crate::SortError,
    },
}

impl CopyOutcome {
    /// Whether the copy succeeded.
    #[must_use]
    pub const fn is_copied(&self) -> bool {
        matches!(self, Self::Copied { .. })
    }

    /// Source path the outcome refers to.
    #[must_use]
    pub fn source(&self) -> &Path {
        match self {
            Self::Copied { source, .. } | Self::Failed { source, .. } => source,
        }
    }
}

/// Record of one failed file carried in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyFailure {
    /// Source file that failed.
    pub source: PathBuf,
    /// Rendered error chain.
    pub reason: String,
}

/// Aggregated result of a sort run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortSummary {
    /// Regular files discovered during scanning.
    pub discovered: usize,
    /// Files copied successfully.
    pub copied: usize,
    /// Files that reached a failed terminal state.
    pub failed: usize,
    /// Directory entries that could not be read while scanning.
    pub scan_errors: usize,
    /// Destination directories created during the run.
    pub directories_created: usize,
    /// Total bytes written.
    pub bytes_copied: u64,
    /// Whether the run was cut short by a cancellation request.
    pub interrupted: bool,
    /// Per-file failures, sorted by source path.
    pub failures: Vec<CopyFailure>,
}

impl SortSummary {
    /// Whether the run finished without failures, scan errors, or interruption.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.scan_errors == 0 && !self.interrupted
    }

    pub(crate) fn record(&mut self, outcome: CopyOutcome) {
        match outcome {
            CopyOutcome::Copied { bytes, .. } => {
                self.copied += 1;
                self.bytes_copied = self.bytes_copied.saturating_add(bytes);
            }
            CopyOutcome::Failed { source, error } => {
                self.record_failure(source, error.detail());
            }
        }
    }

    pub(crate) fn record_failure(&mut self, source: PathBuf, reason: String) {
        self.failed += 1;
        self.failures.push(CopyFailure { source, reason });
    }
}

/// Phases of a single sort run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Enumerating the source tree.
    Scanning,
    /// Classifying entries and spawning copy tasks.
    Dispatching,
    /// Waiting for every spawned task to reach a terminal state.
    Awaiting,
    /// All tasks settled; summary available.
    Completed,
}

impl RunState {
    /// Stable label used in log records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Dispatching => "dispatching",
            Self::Awaiting => "awaiting",
            Self::Completed => "completed",
        }
    }
}
