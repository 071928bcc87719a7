//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// One or more scenarios did not pass
    #[error("{failed} of {total} scenario(s) failed, {skipped} not run")]
    ScenarioFailed {
        /// Scenarios that ran and failed
        failed: usize,
        /// Scenarios never started because of `--fail-fast`
        skipped: usize,
        /// Scenarios given on the command line
        total: usize,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sondar library error
    #[error("Sondar error: {0}")]
    Sondar(#[from] sondar::SondarError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML output error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_failed_message() {
        let err = CliError::ScenarioFailed {
            failed: 1,
            skipped: 2,
            total: 3,
        };
        assert_eq!(err.to_string(), "1 of 3 scenario(s) failed, 2 not run");
    }

    #[test]
    fn test_wraps_library_error() {
        let err: CliError = sondar::SondarError::config("bad interval").into();
        assert!(err.to_string().contains("bad interval"));
    }

    #[test]
    fn test_invalid_argument() {
        let err = CliError::invalid_argument("no scenarios given");
        assert!(err.to_string().starts_with("Invalid argument"));
    }
}
