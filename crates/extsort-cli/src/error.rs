//! CLI error type and exit code mapping.

use std::fmt::{self, Display, Formatter};

use extsort_config::ConfigError;
use extsort_fsops::SortError;

/// CLI-level error type distinguishing validation, operational, and run outcomes.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    Interrupted,
    CompletedWithFailures { failed: usize, scan_errors: usize },
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::CompletedWithFailures { .. } => 1,
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Interrupted => 130,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::Interrupted => "process interrupted by user".to_string(),
            Self::CompletedWithFailures {
                failed,
                scan_errors,
            } => format!(
                "sorting completed with {failed} failed file(s) and {scan_errors} unreadable entry(ies)"
            ),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::validation(error.detail())
    }
}

impl From<SortError> for CliError {
    fn from(error: SortError) -> Self {
        if let SortError::Precondition { path, reason } = &error {
            return Self::validation(format!("{error} ({reason}): {}", path.display()));
        }
        Self::failure(error)
    }
}
