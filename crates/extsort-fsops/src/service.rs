//! Traversal orchestration: scan the source tree, fan out copy tasks, join them.
//!
//! # Design
//! - Precondition failures abort before any output is created.
//! - Scanning runs on a blocking thread; classification is synchronous.
//! - One task per file with no concurrency cap; each task resolves its
//!   destination directory before copying.
//! - Per-key and per-file failures are folded into the summary, never propagated.

use std::collections::HashMap;
use std::fs as std_fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use extsort_telemetry::Metrics;
use tokio::fs;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::classify::classify;
use crate::copy::{self, copy_file};
use crate::error::{SortError, SortResult};
use crate::model::{CopyOutcome, CopyTask, FileEntry, RunState, SortRequest, SortSummary};
use crate::resolver::DestinationResolver;

/// Service that sorts a directory tree into per-extension folders.
#[derive(Clone)]
pub struct SortService {
    metrics: Metrics,
}

impl SortService {
    /// Construct a sort service reporting into the shared metrics registry.
    #[must_use]
    pub const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Metrics registry the service reports into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Copy every regular file under the source root into
    /// `<output_root>/<classification key>/<file name>`.
    ///
    /// Cancelling `shutdown` stops scanning and scheduling; copies already in
    /// flight finish and the summary is returned with `interrupted` set.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::Precondition`] when the source root is missing or
    /// not a directory, or when it is the output root itself, and
    /// [`SortError::Io`] when the output root cannot be created. Failures of
    /// individual files or keys are reported in the summary instead.
    #[instrument(
        name = "sort_directory",
        skip_all,
        fields(
            source = %request.source_root.display(),
            output = %request.output_root.display()
        )
    )]
    pub async fn sort_directory(
        &self,
        request: SortRequest<'_>,
        shutdown: &CancellationToken,
    ) -> SortResult<SortSummary> {
        check_preconditions(&request).await?;
        fs::create_dir_all(request.output_root)
            .await
            .map_err(|err| SortError::io("create_output_root", request.output_root, err))?;

        let mut summary = SortSummary::default();

        enter(RunState::Scanning);
        let scan = self.scan(&request, shutdown).await?;
        summary.discovered = scan.entries.len();
        summary.scan_errors = scan.errors;
        summary.interrupted = scan.interrupted;
        self.metrics.inc_files_discovered(summary.discovered);

        enter(RunState::Dispatching);
        let resolver = Arc::new(DestinationResolver::new(request.output_root));
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();
        for entry in scan.entries {
            if shutdown.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            let key = classify(entry.path());
            debug!(path = %entry.path().display(), key = %key, "classified");
            let source = entry.path().to_path_buf();
            let task = CopyTask { entry, key };
            let handle =
                tasks.spawn(run_copy_task(Arc::clone(&resolver), task).in_current_span());
            pending.insert(handle.id(), source);
        }
        if summary.interrupted {
            warn!(
                abandoned = summary.discovered - pending.len(),
                "cancellation requested; no further copies scheduled"
            );
        }

        enter(RunState::Awaiting);
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    pending.remove(&id);
                    self.observe(&outcome);
                    summary.record(outcome);
                }
                Err(err) => {
                    let source = pending.remove(&err.id()).unwrap_or_default();
                    let error = SortError::join("copy_task", err);
                    error!(
                        source = %source.display(),
                        error = %error.detail(),
                        "copy task did not complete"
                    );
                    self.metrics.inc_files_failed();
                    summary.record_failure(source, error.detail());
                }
            }
        }

        summary.directories_created = resolver.created();
        self.metrics.inc_directories_created(summary.directories_created);
        summary
            .failures
            .sort_by(|left, right| left.source.cmp(&right.source));

        enter(RunState::Completed);
        if summary.is_clean() {
            info!(
                discovered = summary.discovered,
                copied = summary.copied,
                directories = summary.directories_created,
                "file sorting completed"
            );
        } else {
            warn!(
                discovered = summary.discovered,
                copied = summary.copied,
                failed = summary.failed,
                scan_errors = summary.scan_errors,
                interrupted = summary.interrupted,
                "file sorting completed with errors"
            );
        }
        Ok(summary)
    }

    async fn scan(
        &self,
        request: &SortRequest<'_>,
        shutdown: &CancellationToken,
    ) -> SortResult<ScanResult> {
        let source_root = request.source_root.to_path_buf();
        let output_root = request.output_root.to_path_buf();
        let follow_links = request.follow_links;
        let shutdown = shutdown.clone();
        let scan = tokio::task::spawn_blocking(move || {
            let excluded = nested_output(&source_root, &output_root);
            scan_source(&source_root, excluded.as_deref(), follow_links, &shutdown)
        })
        .await
        .map_err(|err| SortError::join("scan_source", err))?;
        self.metrics.inc_scan_errors(scan.errors);
        Ok(scan)
    }

    fn observe(&self, outcome: &CopyOutcome) {
        if outcome.is_copied() {
            self.metrics.inc_files_copied();
        } else {
            self.metrics.inc_files_failed();
        }
    }
}

fn enter(state: RunState) {
    debug!(state = state.as_str(), "sort run state");
}

async fn check_preconditions(request: &SortRequest<'_>) -> SortResult<()> {
    let source_root = request.source_root;
    let reason = match fs::metadata(source_root).await {
        Ok(metadata) if metadata.is_dir() => None,
        Ok(_) => Some("not_a_directory"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Some("not_found"),
        Err(_) => Some("unreadable"),
    };
    if reason.is_none() && same_directory(source_root, request.output_root).await {
        return Err(precondition(source_root, "output_is_source"));
    }
    reason.map_or(Ok(()), |reason| Err(precondition(source_root, reason)))
}

fn precondition(path: &Path, reason: &'static str) -> SortError {
    error!(
        path = %path.display(),
        reason,
        "source folder precondition failed"
    );
    SortError::Precondition {
        path: path.to_path_buf(),
        reason,
    }
}

async fn same_directory(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left).await, fs::canonicalize(right).await) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

/// Path of the output root as seen from the source walk, when it is nested
/// inside the source root.
fn nested_output(source_root: &Path, output_root: &Path) -> Option<PathBuf> {
    let canonical_source = std_fs::canonicalize(source_root).ok()?;
    let canonical_output = std_fs::canonicalize(output_root).ok()?;
    let relative = canonical_output.strip_prefix(&canonical_source).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(source_root.join(relative))
}

#[derive(Debug, Default)]
struct ScanResult {
    entries: Vec<FileEntry>,
    errors: usize,
    interrupted: bool,
}

fn scan_source(
    source_root: &Path,
    excluded: Option<&Path>,
    follow_links: bool,
    shutdown: &CancellationToken,
) -> ScanResult {
    let mut scan = ScanResult::default();
    let walker = WalkDir::new(source_root)
        .follow_links(follow_links)
        .into_iter()
        .filter_entry(|entry| excluded.is_none_or(|excluded| entry.path() != excluded));

    for entry in walker {
        if shutdown.is_cancelled() {
            scan.interrupted = true;
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_dangling_link(&err) => {
                if let Some(path) = err.path() {
                    debug!(path = %path.display(), "skipping dangling symlink");
                }
                continue;
            }
            Err(err) => {
                let path = err
                    .path()
                    .map_or_else(|| source_root.to_path_buf(), Path::to_path_buf);
                let error = SortError::walkdir("scan_source", path, err);
                warn!(error = %error.detail(), "skipping unreadable entry");
                scan.errors += 1;
                continue;
            }
        };
        if is_regular_file(&entry) {
            scan.entries.push(FileEntry::new(entry.into_path()));
        }
    }

    if let Some(excluded) = excluded {
        debug!(excluded = %excluded.display(), "output root pruned from scan");
    }
    scan
}

/// A followed symlink whose target does not exist.
fn is_dangling_link(err: &walkdir::Error) -> bool {
    let not_found = err
        .io_error()
        .is_some_and(|source| source.kind() == io::ErrorKind::NotFound);
    not_found
        && err.path().is_some_and(|path| {
            std_fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_symlink())
        })
}

fn is_regular_file(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    file_type.is_symlink()
        && std_fs::metadata(entry.path()).is_ok_and(|metadata| metadata.is_file())
}

async fn run_copy_task(resolver: Arc<DestinationResolver>, task: CopyTask) -> CopyOutcome {
    let CopyTask { entry, key } = task;
    match resolver.ensure(&key).await {
        Ok(destination_dir) => copy_file(entry.path(), &destination_dir).await,
        Err(err) => copy::failed(entry.path(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use extsort_test_support::SortFixture;
    use std::collections::BTreeSet;

    fn service() -> Result<SortService> {
        Ok(SortService::new(Metrics::new()?))
    }

    fn listing(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|path| (*path).to_string()).collect()
    }

    async fn sort(service: &SortService, fixture: &SortFixture) -> SortResult<SortSummary> {
        service
            .sort_directory(
                SortRequest::new(fixture.source(), fixture.output()),
                &CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn groups_files_by_lowercase_extension() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("a.TXT", b"upper")?;
        fixture.file("b.txt", b"lower")?;
        fixture.file("c", b"bare")?;
        fixture.file(".hidden", b"dot")?;

        let summary = sort(&service()?, &fixture).await?;

        assert_eq!(
            fixture.output_listing()?,
            listing(&[
                "no_extension/.hidden",
                "no_extension/c",
                "txt/a.TXT",
                "txt/b.txt"
            ])
        );
        assert_eq!(summary.discovered, 4);
        assert_eq!(summary.copied, 4);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.directories_created, 2);
        assert!(summary.is_clean());
        assert_eq!(fs::read(fixture.output().join("txt/a.TXT")).await?, b"upper");
        Ok(())
    }

    #[tokio::test]
    async fn nested_files_are_flattened_into_key_folders() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("docs/2024/report.pdf", b"pdf")?;
        fixture.file("music/archive.tar.gz", b"gz")?;

        sort(&service()?, &fixture).await?;

        assert_eq!(
            fixture.output_listing()?,
            listing(&["gz/archive.tar.gz", "pdf/report.pdf"])
        );
        Ok(())
    }

    #[tokio::test]
    async fn empty_source_creates_output_and_succeeds() -> Result<()> {
        let fixture = SortFixture::new()?;

        let summary = sort(&service()?, &fixture).await?;

        assert!(fixture.output().is_dir());
        assert_eq!(summary, SortSummary::default());
        assert!(summary.is_clean());
        Ok(())
    }

    #[tokio::test]
    async fn missing_source_aborts_before_creating_output() -> Result<()> {
        let fixture = SortFixture::new()?;
        let missing = fixture.root().join("missing");

        let err = service()?
            .sort_directory(
                SortRequest::new(&missing, fixture.output()),
                &CancellationToken::new(),
            )
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected precondition error"))?;

        assert!(matches!(
            err,
            SortError::Precondition {
                reason: "not_found",
                ..
            }
        ));
        assert!(!fixture.output().exists());
        Ok(())
    }

    #[tokio::test]
    async fn file_as_source_is_rejected() -> Result<()> {
        let fixture = SortFixture::new()?;
        let file = fixture.file("plain.txt", b"x")?;

        let result = service()?
            .sort_directory(
                SortRequest::new(&file, fixture.output()),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(SortError::Precondition {
                reason: "not_a_directory",
                ..
            })
        ));
        assert!(!fixture.output().exists());
        Ok(())
    }

    #[tokio::test]
    async fn output_equal_to_source_is_rejected() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("a.txt", b"a")?;

        let result = service()?
            .sort_directory(
                SortRequest::new(fixture.source(), fixture.source()),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(SortError::Precondition {
                reason: "output_is_source",
                ..
            })
        ));
        assert!(!fixture.source().join("txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn second_run_overwrites_without_duplicates() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("a.txt", b"first")?;
        fixture.file("nested/b.md", b"md")?;
        let service = service()?;

        sort(&service, &fixture).await?;
        let first = fixture.output_listing()?;
        fixture.file("a.txt", b"second")?;
        let summary = sort(&service, &fixture).await?;

        assert_eq!(fixture.output_listing()?, first);
        assert_eq!(summary.copied, 2);
        assert_eq!(summary.directories_created, 0);
        assert_eq!(fs::read(fixture.output().join("txt/a.txt")).await?, b"second");
        Ok(())
    }

    #[tokio::test]
    async fn single_failure_does_not_abort_the_batch() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("one.log", b"1")?;
        fixture.file("two.log", b"2")?;
        fixture.file("three.csv", b"3")?;
        let blocked = fixture.file("nested/stuck.log", b"4")?;
        std::fs::create_dir_all(fixture.output().join("log/stuck.log"))?;

        let summary = sort(&service()?, &fixture).await?;

        assert_eq!(summary.discovered, 4);
        assert_eq!(summary.copied, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].source, blocked);
        assert!(fixture.output().join("log/one.log").is_file());
        assert!(fixture.output().join("csv/three.csv").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn blocked_key_fails_only_its_files() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("a.bad", b"a")?;
        fixture.file("b.BAD", b"b")?;
        fixture.file("c.good", b"c")?;
        std::fs::create_dir_all(fixture.output())?;
        std::fs::write(fixture.output().join("bad"), b"occupied")?;

        let summary = sort(&service()?, &fixture).await?;

        assert_eq!(summary.copied, 1);
        assert_eq!(summary.failed, 2);
        assert!(
            summary
                .failures
                .iter()
                .all(|failure| failure.reason.starts_with("destination directory creation failed"))
        );
        assert!(fixture.output().join("good/c.good").is_file());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_files_share_one_destination() -> Result<()> {
        let fixture = SortFixture::new()?;
        for index in 0..100 {
            fixture.file(&format!("batch/file-{index:03}.dat"), b"payload")?;
        }

        let summary = sort(&service()?, &fixture).await?;

        assert_eq!(summary.copied, 100);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.directories_created, 1);
        assert_eq!(std::fs::read_dir(fixture.output())?.count(), 1);
        assert_eq!(std::fs::read_dir(fixture.output().join("dat"))?.count(), 100);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_named_files_replace_each_other_whole() -> Result<()> {
        let fixture = SortFixture::new()?;
        let large = vec![b'L'; 8 * 1024 * 1024];
        fixture.file("x/dup.bin", &large)?;
        let small: Vec<Vec<u8>> = (0..8u8).map(|index| vec![b'a' + index]).collect();
        for (index, contents) in small.iter().enumerate() {
            fixture.file(&format!("y{index}/dup.bin"), contents)?;
        }
        let service = service()?;

        for _ in 0..5 {
            let summary = sort(&service, &fixture).await?;
            assert_eq!(summary.copied, 9);
            assert_eq!(summary.failed, 0);

            let landed = std::fs::read(fixture.output().join("bin/dup.bin"))?;
            assert!(
                landed == large || small.contains(&landed),
                "destination holds a mix of sources ({} bytes)",
                landed.len()
            );
            assert_eq!(fixture.output_listing()?, listing(&["bin/dup.bin"]));
        }
        Ok(())
    }

    #[tokio::test]
    async fn nested_output_is_not_rescanned() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("a.txt", b"a")?;
        let output = fixture.source().join("sorted");
        std::fs::create_dir_all(output.join("txt"))?;
        std::fs::write(output.join("txt/old.txt"), b"previous run")?;

        let summary = service()?
            .sort_directory(
                SortRequest::new(fixture.source(), &output),
                &CancellationToken::new(),
            )
            .await?;

        assert_eq!(summary.discovered, 1);
        assert_eq!(
            extsort_test_support::tree_listing(&output)?,
            listing(&["txt/a.txt", "txt/old.txt"])
        );
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_run_copies_nothing_and_reports_interruption() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("a.txt", b"a")?;
        fixture.file("b.txt", b"b")?;
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let summary = service()?
            .sort_directory(
                SortRequest::new(fixture.source(), fixture.output()),
                &shutdown,
            )
            .await?;

        assert!(summary.interrupted);
        assert_eq!(summary.copied, 0);
        assert!(fixture.output_listing()?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn outcomes_are_counted_in_metrics() -> Result<()> {
        let fixture = SortFixture::new()?;
        fixture.file("a.txt", b"a")?;
        fixture.file("b.rs", b"b")?;
        let service = service()?;

        sort(&service, &fixture).await?;

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.files_discovered_total, 2);
        assert_eq!(snapshot.files_copied_total, 2);
        assert_eq!(snapshot.files_failed_total, 0);
        assert_eq!(snapshot.directories_created_total, 2);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_to_files_are_copied_and_directory_links_skipped() -> Result<()> {
        use std::os::unix::fs::symlink;

        let fixture = SortFixture::new()?;
        let target = extsort_test_support::write_file(fixture.root(), "outside/real.json", b"{}")?;
        symlink(&target, fixture.source().join("link.json"))?;
        symlink(fixture.root().join("outside"), fixture.source().join("linked_dir"))?;
        symlink(fixture.root().join("nowhere"), fixture.source().join("dangling.txt"))?;

        let summary = sort(&service()?, &fixture).await?;

        assert_eq!(summary.discovered, 1);
        assert_eq!(fixture.output_listing()?, listing(&["json/link.json"]));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn follow_links_descends_into_linked_directories() -> Result<()> {
        use std::os::unix::fs::symlink;

        let fixture = SortFixture::new()?;
        extsort_test_support::write_file(fixture.root(), "outside/real.json", b"{}")?;
        symlink(fixture.root().join("outside"), fixture.source().join("linked_dir"))?;

        let summary = service()?
            .sort_directory(
                SortRequest::new(fixture.source(), fixture.output()).with_follow_links(true),
                &CancellationToken::new(),
            )
            .await?;

        assert_eq!(summary.copied, 1);
        assert_eq!(fixture.output_listing()?, listing(&["json/real.json"]));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn follow_links_skips_dangling_links_silently() -> Result<()> {
        use std::os::unix::fs::symlink;

        let fixture = SortFixture::new()?;
        fixture.file("a.txt", b"a")?;
        symlink(fixture.root().join("nowhere"), fixture.source().join("dangling.txt"))?;

        let summary = service()?
            .sort_directory(
                SortRequest::new(fixture.source(), fixture.output()).with_follow_links(true),
                &CancellationToken::new(),
            )
            .await?;

        assert_eq!(summary.copied, 1);
        assert_eq!(summary.scan_errors, 0);
        assert!(summary.is_clean());
        assert_eq!(fixture.output_listing()?, listing(&["txt/a.txt"]));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_entries_are_counted_and_siblings_still_copied() -> Result<()> {
        use std::os::unix::fs::symlink;

        let fixture = SortFixture::new()?;
        fixture.file("a.txt", b"a")?;
        fixture.file("dir/b.md", b"b")?;
        symlink(fixture.source().join("dir"), fixture.source().join("dir/loop"))?;
        let service = service()?;

        let summary = service
            .sort_directory(
                SortRequest::new(fixture.source(), fixture.output()).with_follow_links(true),
                &CancellationToken::new(),
            )
            .await?;

        assert_eq!(summary.scan_errors, 1);
        assert_eq!(summary.copied, 2);
        assert_eq!(summary.failed, 0);
        assert!(!summary.is_clean());
        assert_eq!(
            fixture.output_listing()?,
            listing(&["md/b.md", "txt/a.txt"])
        );
        assert_eq!(service.metrics().snapshot().scan_errors_total, 1);
        Ok(())
    }
}
