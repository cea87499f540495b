//! Logging bootstrap
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the directive passed by the caller.

use crate::error::TelemetryError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install the global subscriber with human-readable output
///
/// # Errors
/// - `TelemetryError::Filter` if `default_directive` does not parse
/// - `TelemetryError::AlreadyInstalled` if a subscriber is already set
pub fn init(default_directive: &str) -> Result<(), TelemetryError> {
    init_with_format(default_directive, LogFormat::Pretty)
}

/// Install the global subscriber with the given output format
///
/// # Errors
/// As [`init`].
pub fn init_with_format(default_directive: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter = env_filter(default_directive)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    installed.map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))
}

fn env_filter(default_directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| TelemetryError::Filter(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_an_error_not_a_panic() {
        // The first call may lose to another test's subscriber; either way the
        // second must fail cleanly.
        let _ = init("warn");
        let err = init("warn").unwrap_err();
        assert!(matches!(err, TelemetryError::AlreadyInstalled(_)));
    }
}
