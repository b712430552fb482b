//! # urlprobe
//!
//! Concurrent HTTP batch probing engine with declarative field
//! extraction.
//!
//! Given a list of targets and a merged configuration, urlprobe
//! dispatches each target to a bounded worker pool, issues an HTTP
//! request built from the configured template, splits every response
//! into three informational layers (response headers, transport
//! metadata, body), resolves the configured output fields against
//! those layers with a defined precedence, and aggregates one row per
//! target into a tabular report.
//!
//! ## Design Philosophy
//!
//! - **Degrade, never drop** - a failed target yields a row of `N/A`
//!   sentinels; the batch always completes with one row per target
//! - **Library-first** - no CLI or UI; the surrounding tool owns option
//!   parsing and input files
//! - **Explicit configuration** - no process-wide mutable state; every
//!   component receives the immutable merged [`Config`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use urlprobe::{Config, Engine, report, target};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_yaml_str(
//!         r#"
//! proto: https
//! domain: www.example.com
//! result:
//!   - http_code
//!   - content-type
//!   - "m/<title>(.*)</title>/"
//! "#,
//!     )?;
//!
//!     let targets = target::load_targets("targets.txt").await?;
//!     let engine = Engine::new(config)?;
//!     let results = engine.run(targets).await?;
//!
//!     println!("{}", report::render(&engine.config().output_fields, &results));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Probing engine and worker pool
pub mod engine;
/// Error types
pub mod error;
/// Output field compilation and resolution
pub mod field;
/// Log output setup (rotating file + console)
pub mod logging;
/// Response parsing into header/metadata/body layers
pub mod parse;
/// Tabular report rendering
pub mod report;
/// Request construction from targets and configuration
pub mod request;
/// Retry logic with exponential backoff
pub mod retry;
/// Target list handling
pub mod target;
/// Transport executors (native HTTP client and external fetch tool)
pub mod transport;

// Re-export commonly used types
pub use config::{Config, RetryConfig, RuntimeConfig};
pub use engine::{Engine, ResultRow, ResultSet};
pub use error::{Error, ParseError, Result, TransportError};
pub use field::{CompiledField, FieldSpec, NOT_AVAILABLE};
pub use parse::{ParsedResponse, RawResponse};
pub use request::RequestSpec;
pub use target::Target;
pub use transport::{CommandTransport, HttpTransport, Transport};
