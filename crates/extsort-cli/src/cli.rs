//! Argument parsing, interrupt wiring, and run dispatch for the `extsort` binary.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::anyhow;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use extsort_config::{RawSettings, SortSettings};
use extsort_fsops::{SortRequest, SortService, SortSummary};
use extsort_telemetry::{Metrics, init_logging};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CliError, CliResult};
use crate::output::{SummaryFormat, render_summary};

/// Parses CLI arguments, installs logging, runs the sort, and renders the
/// summary. Returns the process exit code.
pub async fn run() -> i32 {
    match run_cli(Cli::parse()).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn run_cli(cli: Cli) -> CliResult<()> {
    let summary_format = cli.summary;
    let metrics_file = cli.metrics_file.clone();
    let settings = settings_from_cli(cli)?;
    init_logging(&settings.logging().logging_config()).map_err(CliError::failure)?;

    let shutdown = CancellationToken::new();
    let watcher = spawn_interrupt_watcher(shutdown.clone());
    let metrics = Metrics::new().map_err(CliError::failure)?;
    let outcome = execute(&settings, &metrics, &shutdown).await;
    watcher.abort();

    let summary = outcome?;
    render_summary(&summary, summary_format)?;
    if let Some(path) = metrics_file {
        write_metrics(&metrics, &path)?;
    }
    conclude(&summary, &shutdown)
}

#[derive(Parser, Debug)]
#[command(
    name = "extsort",
    version,
    about = "Copy every file under a directory tree into one folder per file extension"
)]
pub(crate) struct Cli {
    /// Directory tree to sort.
    source: PathBuf,
    /// Directory receiving one folder per extension; created when missing.
    output: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "EXTSORT_LOG_LEVEL")]
    log_level: Option<String>,
    /// Log record format (pretty or json).
    #[arg(long, env = "EXTSORT_LOG_FORMAT")]
    log_format: Option<String>,
    /// Mirror log records into this file.
    #[arg(long, env = "EXTSORT_LOG_FILE")]
    log_file: Option<PathBuf>,
    /// Descend into symlinked directories. The environment variable accepts
    /// true/false, yes/no, on/off, or 1/0.
    #[arg(
        long,
        env = "EXTSORT_FOLLOW_LINKS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    follow_links: bool,
    /// Write the run's counters to this file in Prometheus text format.
    #[arg(long, env = "EXTSORT_METRICS_FILE")]
    metrics_file: Option<PathBuf>,
    /// Format of the summary printed after the run.
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    summary: SummaryFormat,
}

fn settings_from_cli(cli: Cli) -> CliResult<SortSettings> {
    let raw = RawSettings {
        source_root: cli.source,
        output_root: cli.output,
        follow_links: cli.follow_links.then_some(true),
        log_level: cli.log_level,
        log_format: cli.log_format,
        log_file: cli.log_file,
    };
    Ok(SortSettings::from_raw(raw)?)
}

fn spawn_interrupt_watcher(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, &shutdown).await == Interrupt::Forced {
            process::exit(CliError::Interrupted.exit_code());
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// A second signal arrived while in-flight copies were settling.
    Forced,
    /// Signals cannot be observed on this platform or process.
    Unavailable,
}

/// The first signal cancels `shutdown`; the second one asks for an immediate exit.
async fn watch_interrupts<F, Fut>(mut next_signal: F, shutdown: &CancellationToken) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    loop {
        if let Err(err) = next_signal().await {
            warn!(error = %err, "failed to listen for interrupt signal");
            return Interrupt::Unavailable;
        }
        if shutdown.is_cancelled() {
            warn!("second interrupt received; exiting without waiting for in-flight copies");
            return Interrupt::Forced;
        }
        warn!("process interrupted by user");
        shutdown.cancel();
    }
}

pub(crate) async fn execute(
    settings: &SortSettings,
    metrics: &Metrics,
    shutdown: &CancellationToken,
) -> CliResult<SortSummary> {
    let service = SortService::new(metrics.clone());
    let request = SortRequest::new(settings.source_root(), settings.output_root())
        .with_follow_links(settings.follow_links());

    let summary = service.sort_directory(request, shutdown).await?;
    debug!(metrics = ?metrics.snapshot(), "sort metrics");
    Ok(summary)
}

fn write_metrics(metrics: &Metrics, path: &Path) -> CliResult<()> {
    let rendered = metrics.render().map_err(CliError::failure)?;
    std::fs::write(path, rendered).map_err(|err| {
        CliError::failure(anyhow!(
            "failed to write metrics to {}: {err}",
            path.display()
        ))
    })
}

pub(crate) fn conclude(summary: &SortSummary, shutdown: &CancellationToken) -> CliResult<()> {
    if summary.interrupted || shutdown.is_cancelled() {
        return Err(CliError::Interrupted);
    }
    if summary.failed > 0 || summary.scan_errors > 0 {
        return Err(CliError::CompletedWithFailures {
            failed: summary.failed,
            scan_errors: summary.scan_errors,
        });
    }
    Ok(())
}
