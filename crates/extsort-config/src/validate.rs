//! Validation helpers and parsing utilities for run settings.

use std::path::Path;

use extsort_telemetry::{LogFormat, log_format_from_str};

use crate::defaults::{DEFAULT_LOG_LEVEL, LOG_LEVELS};
use crate::error::{ConfigError, ConfigResult};

/// Reject empty paths for `field`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the path is empty.
pub fn validate_path(field: &'static str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            reason: "empty",
            value: None,
        });
    }
    Ok(())
}

/// Reject an output root that is spelled identically to the source root.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when both roots are the same path.
pub fn validate_distinct_roots(source_root: &Path, output_root: &Path) -> ConfigResult<()> {
    if source_root == output_root {
        return Err(ConfigError::invalid(
            "output_root",
            "same_as_source",
            output_root.display().to_string(),
        ));
    }
    Ok(())
}

/// Normalise a log level, defaulting when absent.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for levels outside
/// [`LOG_LEVELS`](crate::defaults::LOG_LEVELS).
pub fn parse_log_level(value: Option<&str>) -> ConfigResult<String> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(DEFAULT_LOG_LEVEL.to_string());
    };
    let level = raw.to_ascii_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        Ok(level)
    } else {
        Err(ConfigError::invalid("log_level", "unknown_level", raw))
    }
}

/// Parse a log format label, inferring from the build profile when absent.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for labels other than `pretty`,
/// `text`, or `json`.
pub fn parse_log_format(value: Option<&str>) -> ConfigResult<LogFormat> {
    match value.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(LogFormat::infer()),
        Some(raw) => log_format_from_str(raw)
            .ok_or_else(|| ConfigError::invalid("log_format", "unknown_format", raw)),
    }
}
