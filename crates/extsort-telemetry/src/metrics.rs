//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters relevant to a sort run.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared by the sort service and CLI.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    files_discovered_total: IntCounter,
    files_copied_total: IntCounter,
    files_failed_total: IntCounter,
    directories_created_total: IntCounter,
    scan_errors_total: IntCounter,
}

/// Snapshot of the sort counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Regular files discovered while scanning.
    pub files_discovered_total: u64,
    /// Files copied successfully.
    pub files_copied_total: u64,
    /// Files that failed to copy.
    pub files_failed_total: u64,
    /// Destination directories created.
    pub directories_created_total: u64,
    /// Unreadable entries skipped while scanning.
    pub scan_errors_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let files_discovered_total = register(
            &registry,
            "extsort_files_discovered_total",
            "Regular files discovered in the source tree",
        )?;
        let files_copied_total = register(
            &registry,
            "extsort_files_copied_total",
            "Files copied into their destination folder",
        )?;
        let files_failed_total = register(
            &registry,
            "extsort_files_failed_total",
            "Files that failed to copy",
        )?;
        let directories_created_total = register(
            &registry,
            "extsort_directories_created_total",
            "Destination directories created",
        )?;
        let scan_errors_total = register(
            &registry,
            "extsort_scan_errors_total",
            "Unreadable entries skipped while scanning",
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                files_discovered_total,
                files_copied_total,
                files_failed_total,
                directories_created_total,
                scan_errors_total,
            }),
        })
    }

    /// Add discovered files to the discovery counter.
    pub fn inc_files_discovered(&self, count: usize) {
        self.inner.files_discovered_total.inc_by(as_u64(count));
    }

    /// Increment the copied file counter.
    pub fn inc_files_copied(&self) {
        self.inner.files_copied_total.inc();
    }

    /// Increment the failed file counter.
    pub fn inc_files_failed(&self) {
        self.inner.files_failed_total.inc();
    }

    /// Add created directories to the directory counter.
    pub fn inc_directories_created(&self, count: usize) {
        self.inner.directories_created_total.inc_by(as_u64(count));
    }

    /// Add skipped entries to the scan error counter.
    pub fn inc_scan_errors(&self, count: usize) {
        self.inner.scan_errors_total.inc_by(as_u64(count));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_discovered_total: self.inner.files_discovered_total.get(),
            files_copied_total: self.inner.files_copied_total.get(),
            files_failed_total: self.inner.files_failed_total.get(),
            directories_created_total: self.inner.directories_created_total.get(),
            scan_errors_total: self.inner.scan_errors_total.get(),
        }
    }
}

fn register(registry: &Registry, name: &'static str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(counter)
}

fn as_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}
