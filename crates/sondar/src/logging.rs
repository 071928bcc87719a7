//! Tracing subscriber setup for binaries and harnesses embedding Sondar.
//!
//! The library itself only emits `tracing` events. `RUST_LOG` always wins
//! over the default directive passed in here.

use crate::result::{SondarError, SondarResult};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines on stderr
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Build the filter: `RUST_LOG` if set and valid, otherwise `default_directive`.
pub fn env_filter(default_directive: &str) -> SondarResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| SondarError::config(format!("invalid log filter {default_directive:?}: {err}")))
}

/// Install a global subscriber.
///
/// Fails if one is already installed.
pub fn init_tracing(default_directive: &str, format: LogFormat) -> SondarResult<()> {
    let filter = env_filter(default_directive)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|err| SondarError::config(format!("tracing already initialized: {err}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive_rejected() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(env_filter("sondar=verbose").is_err());
        }
    }

    #[test]
    fn test_valid_directive() {
        assert!(env_filter("sondar=debug,warn").is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        // Whichever call installs first, the other must report an error.
        let first = init_tracing("warn", LogFormat::Pretty);
        let second = init_tracing("warn", LogFormat::Json);
        assert!(first.is_err() || second.is_err());
    }
}
