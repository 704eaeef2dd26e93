//! Default values applied when settings are not supplied.
//!
//! # Design
//! - Centralize defaults so the CLI and tests agree on them.

/// Default log level when neither flags nor `RUST_LOG` provide one.
pub const DEFAULT_LOG_LEVEL: &str = extsort_telemetry::DEFAULT_LOG_LEVEL;
/// Symlinked directories are not descended unless requested.
pub const DEFAULT_FOLLOW_LINKS: bool = false;
/// Log levels accepted by the settings validator.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
