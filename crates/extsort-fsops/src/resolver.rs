//! Destination directory resolution shared by concurrent copy tasks.
//!
//! # Design
//! - One memoized creation cell per classification key; only the first caller
//!   touches the filesystem, later callers await the same outcome.
//! - Failures are memoized too, so every copy waiting on a broken key fails
//!   with the same cause while other keys proceed.
//! - The map lock is held only to fetch a cell, never across IO.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::error::{SortError, SortResult};
use crate::model::ClassificationKey;

type Resolution = Result<PathBuf, Arc<io::Error>>;

/// Concurrent get-or-create over `<output_root>/<key>` directories.
#[derive(Debug)]
pub struct DestinationResolver {
    output_root: PathBuf,
    slots: Mutex<HashMap<ClassificationKey, Arc<OnceCell<Resolution>>>>,
    created: AtomicUsize,
}

impl DestinationResolver {
    /// Bind a resolver to an output root that already exists.
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            slots: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Number of directories this resolver created (pre-existing ones excluded).
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Ensure the destination directory for `key` exists and return its path.
    ///
    /// Safe to call concurrently with the same key; an already existing
    /// directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::DirectoryCreation`] when the filesystem rejects the
    /// directory, including when a non-directory occupies the path.
    pub async fn ensure(&self, key: &ClassificationKey) -> SortResult<PathBuf> {
        let slot = self.slot(key);
        match slot.get_or_init(|| self.create(key)).await {
            Ok(path) => Ok(path.clone()),
            Err(source) => Err(SortError::DirectoryCreation {
                key: key.to_string(),
                path: self.output_root.join(key.as_str()),
                source: Arc::clone(source),
            }),
        }
    }

    fn slot(&self, key: &ClassificationKey) -> Arc<OnceCell<Resolution>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    async fn create(&self, key: &ClassificationKey) -> Resolution {
        let path = self.output_root.join(key.as_str());
        match create_directory(&path).await {
            Ok(true) => {
                self.created.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, path = %path.display(), "destination directory created");
                Ok(path)
            }
            Ok(false) => {
                debug!(key = %key, path = %path.display(), "destination directory already present");
                Ok(path)
            }
            Err(err) => {
                error!(
                    key = %key,
                    path = %path.display(),
                    error = %err,
                    "failed to create destination directory"
                );
                Err(Arc::new(err))
            }
        }
    }
}

/// Create `path`, returning whether this call created it.
async fn create_directory(path: &Path) -> io::Result<bool> {
    match fs::create_dir(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            let metadata = fs::metadata(path).await?;
            if metadata.is_dir() {
                Ok(false)
            } else {
                Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "destination path exists and is not a directory",
                ))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).await?;
            Ok(true)
        }
        Err(err) => Err(err),
    }
}
