//! Error types for urlprobe
//!
//! The error taxonomy mirrors the containment policy of the engine:
//! - Configuration errors are fatal at startup when the whole run is
//!   invalid (empty field list, bad concurrency), and per-target only
//!   when a single target cannot be turned into a request.
//! - Transport and parse errors are contained at the worker boundary;
//!   they degrade a single result row and never abort the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for urlprobe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for urlprobe
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "result")
        key: Option<String>,
    },

    /// Transport-level failure (timeout, connection failure, spawn failure)
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response parsing failure (scratch file problems)
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error from the native HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration document could not be deserialized
    #[error("configuration document error: {0}")]
    ConfigDocument(#[from] serde_yaml::Error),

    /// A worker task panicked or was cancelled before completing
    #[error("worker task failed: {0}")]
    WorkerJoin(String),
}

impl Error {
    /// Convenience constructor for configuration errors
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Error::Config {
            message: message.into(),
            key: key.map(String::from),
        }
    }
}

/// Transport-level errors
///
/// These never abort the batch: the worker logs them and fills the row
/// with the `N/A` sentinel for every field the transport would have
/// supplied.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout
    #[error("request to {url} timed out after {seconds}s")]
    Timeout {
        /// The URL that was being fetched
        url: String,
        /// The configured timeout in seconds
        seconds: u64,
    },

    /// The native HTTP client failed (DNS, TLS, connection reset, ...)
    #[error("request to {url} failed: {source}")]
    Network {
        /// The URL that was being fetched
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The external fetch command could not be spawned
    #[error("failed to spawn fetch command {command:?}: {source}")]
    Spawn {
        /// The command that was being executed
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Response parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// The scratch file holding the response body was missing or unreadable
    #[error("scratch file {path} unreadable: {source}")]
    ScratchFile {
        /// Path of the scratch file that was expected to hold the body
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
