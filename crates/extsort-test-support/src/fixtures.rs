//! Test fixtures for building source trees and inspecting sorted output.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

/// Temporary workspace holding a `source` tree and an `output` location.
///
/// The source directory is created eagerly; the output directory is left for
/// the code under test to create.
#[derive(Debug)]
pub struct SortFixture {
    temp: TempDir,
    source: PathBuf,
    output: PathBuf,
}

impl SortFixture {
    /// Create a fresh fixture with an empty source directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let temp = tempfile::Builder::new().prefix("extsort-").tempdir()?;
        let source = temp.path().join("source");
        let output = temp.path().join("output");
        fs::create_dir(&source)?;
        Ok(Self {
            temp,
            source,
            output,
        })
    }

    /// Root of the temporary workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Source tree root.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Output root (not created by the fixture).
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Write `contents` to `relative` under the source root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parents cannot be written.
    pub fn file(&self, relative: &str, contents: &[u8]) -> io::Result<PathBuf> {
        write_file(&self.source, relative, contents)
    }

    /// Relative paths of every file under the output root.
    ///
    /// # Errors
    ///
    /// Returns an error if the output tree cannot be traversed.
    pub fn output_listing(&self) -> io::Result<BTreeSet<String>> {
        tree_listing(&self.output)
    }
}

/// Write `contents` to `root/relative`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file or its parents cannot be written.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> io::Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}

/// Relative, `/`-separated paths of every regular file under `root`.
///
/// # Errors
///
/// Returns an error if any entry under `root` cannot be read.
pub fn tree_listing(root: &Path) -> io::Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?;
        let parts: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.insert(parts.join("/"));
    }
    Ok(files)
}
