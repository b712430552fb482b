//! Transport executors
//!
//! A [`Transport`] turns one [`RequestSpec`] into a [`ParsedResponse`].
//! Two implementations ship with the crate:
//!
//! - [`HttpTransport`] — the default: a native HTTP client that fills
//!   the three response namespaces directly, with no text re-parsing.
//! - [`CommandTransport`] — spawns an external curl-style fetch tool
//!   and runs its output through the line-classification parser; used
//!   when the configuration sets a `command` prefix.
//!
//! Transport failures are returned to the worker, which logs them and
//! degrades the affected row; they never abort the batch.

mod command;
mod http;

pub use command::CommandTransport;
pub use http::HttpTransport;

use crate::error::TransportError;
use crate::parse::ParsedResponse;
use crate::request::RequestSpec;
use async_trait::async_trait;

/// Executes one probe request
///
/// Implementations must be safe to share across workers; per-request
/// state lives in the [`RequestSpec`] (notably the worker-unique
/// scratch path).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the target described by `spec` and split the response into
    /// its informational layers
    async fn fetch(&self, spec: &RequestSpec) -> Result<ParsedResponse, TransportError>;

    /// Short implementation name used in log events
    fn name(&self) -> &'static str;
}
