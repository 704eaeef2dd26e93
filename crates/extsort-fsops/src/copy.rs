//! Per-file copy execution.
//!
//! Every copy is staged in a temporary file next to its destination and then
//! renamed into place, so a destination always holds one complete source file
//! even when several same-named files race for it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::error::SortError;
use crate::model::CopyOutcome;

/// Copy `source` into `destination_dir`, keeping its file name.
///
/// An existing file with the same name is replaced as a whole (last writer
/// wins). The outcome is logged and returned; failures never propagate past
/// this boundary.
pub async fn copy_file(source: &Path, destination_dir: &Path) -> CopyOutcome {
    let Some(file_name) = source.file_name() else {
        let error = SortError::Copy {
            path: source.to_path_buf(),
            destination: destination_dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
        };
        return failed(source, error);
    };
    let destination = destination_dir.join(file_name);

    let staged = {
        let source = source.to_path_buf();
        let destination_dir = destination_dir.to_path_buf();
        let destination = destination.clone();
        tokio::task::spawn_blocking(move || replace(&source, &destination_dir, &destination))
            .await
    };

    match staged {
        Ok(Ok(bytes)) => {
            info!(
                source = %source.display(),
                destination = %destination.display(),
                bytes,
                "copied {} -> {}",
                source.display(),
                destination.display()
            );
            CopyOutcome::Copied {
                source: source.to_path_buf(),
                destination,
                bytes,
            }
        }
        Ok(Err(err)) => failed(source, copy_error(source, destination, err)),
        Err(err) => failed(source, SortError::join("copy_file", err)),
    }
}

/// Stage `source` in `destination_dir` and rename it onto `destination`.
/// The staging file is removed when any step fails.
fn replace(source: &Path, destination_dir: &Path, destination: &Path) -> io::Result<u64> {
    let staging = NamedTempFile::new_in(destination_dir)?;
    let bytes = fs::copy(source, staging.path())?;
    staging.persist(destination).map_err(|err| err.error)?;
    Ok(bytes)
}

fn copy_error(source: &Path, destination: PathBuf, err: io::Error) -> SortError {
    SortError::Copy {
        path: source.to_path_buf(),
        destination,
        source: err,
    }
}

pub(crate) fn failed(source: &Path, error: SortError) -> CopyOutcome {
    error!(
        source = %source.display(),
        error = %error.detail(),
        "failed to copy {}",
        source.display()
    );
    CopyOutcome::Failed {
        source: source.to_path_buf(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs as std_fs;
    use std::collections::BTreeSet;

    fn entries(dir: &Path) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in std_fs::read_dir(dir)? {
            names.insert(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    #[tokio::test]
    async fn copies_into_destination_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("report.PDF");
        std_fs::write(&source, b"%PDF-1.7")?;
        let destination_dir = temp.path().join("pdf");
        std_fs::create_dir(&destination_dir)?;

        let outcome = copy_file(&source, &destination_dir).await;
        let CopyOutcome::Copied {
            destination, bytes, ..
        } = outcome
        else {
            anyhow::bail!("expected copy to succeed");
        };
        assert_eq!(destination, destination_dir.join("report.PDF"));
        assert_eq!(bytes, 8);
        assert_eq!(std_fs::read(&destination)?, b"%PDF-1.7");
        assert!(source.exists());
        Ok(())
    }

    #[tokio::test]
    async fn overwrites_existing_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("notes.txt");
        std_fs::write(&source, b"new")?;
        let destination_dir = temp.path().join("txt");
        std_fs::create_dir(&destination_dir)?;
        std_fs::write(destination_dir.join("notes.txt"), b"old contents")?;

        let outcome = copy_file(&source, &destination_dir).await;
        assert!(outcome.is_copied());
        assert_eq!(std_fs::read(destination_dir.join("notes.txt"))?, b"new");
        Ok(())
    }

    #[tokio::test]
    async fn missing_source_is_reported_as_failure() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("vanished.txt");
        let destination_dir = temp.path().join("txt");
        std_fs::create_dir(&destination_dir)?;

        let outcome = copy_file(&source, &destination_dir).await;
        assert_eq!(outcome.source(), source.as_path());
        let CopyOutcome::Failed { error, .. } = outcome else {
            anyhow::bail!("expected copy failure");
        };
        assert!(matches!(
            error,
            SortError::Copy { ref source, .. } if source.kind() == io::ErrorKind::NotFound
        ));
        assert!(!destination_dir.join("vanished.txt").exists());
        assert!(entries(&destination_dir)?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn directory_in_the_way_is_reported_as_failure() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("data.csv");
        std_fs::write(&source, b"a,b")?;
        let destination_dir = temp.path().join("csv");
        std_fs::create_dir_all(destination_dir.join("data.csv"))?;

        let outcome = copy_file(&source, &destination_dir).await;
        assert!(matches!(outcome, CopyOutcome::Failed { .. }));
        assert!(destination_dir.join("data.csv").is_dir());
        assert_eq!(entries(&destination_dir)?, BTreeSet::from(["data.csv".to_string()]));
        Ok(())
    }

    #[tokio::test]
    async fn path_without_file_name_is_rejected() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let outcome = copy_file(Path::new("/"), temp.path()).await;
        let CopyOutcome::Failed { error, .. } = outcome else {
            anyhow::bail!("expected copy failure");
        };
        assert!(matches!(
            error,
            SortError::Copy { ref source, .. } if source.kind() == io::ErrorKind::InvalidInput
        ));
        Ok(())
    }
}
