//! Summary renderers and formatting helpers.

use std::io::Write;

use anyhow::anyhow;
use clap::ValueEnum;
use extsort_fsops::SortSummary;

use crate::error::{CliError, CliResult};

/// Output format for the final run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SummaryFormat {
    Text,
    Json,
}

pub(crate) fn render_summary(summary: &SortSummary, format: SummaryFormat) -> CliResult<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_summary(&mut handle, summary, format)
}

pub(crate) fn write_summary(
    writer: &mut impl Write,
    summary: &SortSummary,
    format: SummaryFormat,
) -> CliResult<()> {
    let write_failed =
        |err: std::io::Error| CliError::failure(anyhow!("failed to write summary: {err}"));
    match format {
        SummaryFormat::Json => {
            let text = serde_json::to_string_pretty(summary)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            writeln!(writer, "{text}").map_err(write_failed)?;
        }
        SummaryFormat::Text => {
            writeln!(writer, "discovered: {}", summary.discovered).map_err(write_failed)?;
            writeln!(
                writer,
                "copied: {} ({})",
                summary.copied,
                format_bytes(summary.bytes_copied)
            )
            .map_err(write_failed)?;
            writeln!(writer, "failed: {}", summary.failed).map_err(write_failed)?;
            writeln!(writer, "directories created: {}", summary.directories_created)
                .map_err(write_failed)?;
            if summary.scan_errors > 0 {
                writeln!(writer, "unreadable entries: {}", summary.scan_errors)
                    .map_err(write_failed)?;
            }
            if summary.interrupted {
                writeln!(writer, "interrupted: yes").map_err(write_failed)?;
            }
            if !summary.failures.is_empty() {
                writeln!(writer, "failures:").map_err(write_failed)?;
                for failure in &summary.failures {
                    writeln!(writer, "  {}: {}", failure.source.display(), failure.reason)
                        .map_err(write_failed)?;
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
