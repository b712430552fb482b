//! Log output setup
//!
//! Probe runs log to two sinks: a rotating log file at the configured
//! level (debug runs record per-request commands and the parsed
//! namespaces) and the console at a coarser verbosity so batch
//! progress stays readable. Embedders with their own subscriber can
//! skip this entirely; the engine only emits `tracing` events.

use crate::error::{Error, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// File name prefix for the rotating log
const LOG_FILE_PREFIX: &str = "urlprobe.log";

/// Console verbosity: one notch coarser than typical file logging
const CONSOLE_LEVEL: &str = "info";

/// Initialize global logging: rotating file plus console
///
/// `level` applies to the log file (`error`, `warn`, `info`, `debug`,
/// `trace`, or any `tracing_subscriber` filter directive); the console
/// stays at `info`. The returned guard must be held for the lifetime
/// of the process — dropping it stops the background log writer.
///
/// # Errors
///
/// Returns a configuration error for an unparseable level, and an
/// error if a global subscriber is already installed.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<WorkerGuard> {
    let file_filter = EnvFilter::try_new(level).map_err(|e| {
        Error::config(
            format!("invalid log level {level:?}: {e}"),
            Some("config.logLevel"),
        )
    })?;
    let console_filter = EnvFilter::try_new(CONSOLE_LEVEL)
        .map_err(|e| Error::config(format!("invalid console level: {e}"), None))?;

    let file_appender = tracing_appender::rolling::daily(log_dir.as_ref(), LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(fmt::layer().with_target(false).with_filter(console_filter))
        .try_init()
        .map_err(|e| Error::config(format!("logging already initialized: {e}"), None))?;

    Ok(guard)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_rejected_before_install() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = init_logging("not-a-level=nope=", dir.path()).unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("config.logLevel")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
