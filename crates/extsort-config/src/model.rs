//! Typed settings models.
//!
//! # Design
//! - `RawSettings` carries unvalidated values straight from flags/environment.
//! - `SortSettings` is only constructed through validation.

use std::path::{Path, PathBuf};

use extsort_telemetry::{LogFormat, LoggingConfig};

use crate::defaults::DEFAULT_FOLLOW_LINKS;
use crate::error::ConfigResult;
use crate::validate::{parse_log_format, parse_log_level, validate_distinct_roots, validate_path};

/// Unvalidated settings as supplied by the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    /// Directory tree to sort.
    pub source_root: PathBuf,
    /// Directory receiving the per-extension folders.
    pub output_root: PathBuf,
    /// Descend into symlinked directories.
    pub follow_links: Option<bool>,
    /// Requested log level.
    pub log_level: Option<String>,
    /// Requested log format label.
    pub log_format: Option<String>,
    /// Optional log file path.
    pub log_file: Option<PathBuf>,
}

/// Logging portion of the validated settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Normalised log level.
    pub level: String,
    /// Output format for every sink.
    pub format: LogFormat,
    /// File sink mirroring console output.
    pub file: Option<PathBuf>,
}

impl LoggingSettings {
    /// Borrow the settings as a telemetry logging configuration.
    #[must_use]
    pub fn logging_config(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.level,
            format: self.format,
            file: self.file.as_deref(),
        }
    }
}

/// Validated settings for a sort run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSettings {
    source_root: PathBuf,
    output_root: PathBuf,
    follow_links: bool,
    logging: LoggingSettings,
}

impl SortSettings {
    /// Validate raw settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`](crate::ConfigError::InvalidField)
    /// for empty paths, identical roots, unknown log levels, unknown log
    /// formats, or an empty log file path.
    pub fn from_raw(raw: RawSettings) -> ConfigResult<Self> {
        validate_path("source_root", &raw.source_root)?;
        validate_path("output_root", &raw.output_root)?;
        validate_distinct_roots(&raw.source_root, &raw.output_root)?;
        if let Some(file) = &raw.log_file {
            validate_path("log_file", file)?;
        }

        let logging = LoggingSettings {
            level: parse_log_level(raw.log_level.as_deref())?,
            format: parse_log_format(raw.log_format.as_deref())?,
            file: raw.log_file,
        };

        Ok(Self {
            source_root: raw.source_root,
            output_root: raw.output_root,
            follow_links: raw.follow_links.unwrap_or(DEFAULT_FOLLOW_LINKS),
            logging,
        })
    }

    /// Directory tree to sort.
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Directory receiving the per-extension folders.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Whether symlinked directories are descended.
    #[must_use]
    pub const fn follow_links(&self) -> bool {
        self.follow_links
    }

    /// Logging settings.
    #[must_use]
    pub const fn logging(&self) -> &LoggingSettings {
        &self.logging
    }
}
