//! Configuration types for urlprobe
//!
//! A [`Config`] is a merged structure: every field carries a serde
//! default, so a user-supplied document only needs to name the keys it
//! wants to override (user values win on conflict). The external key
//! names (`proto`, `domain`, `user-agent`, `result`, the nested
//! `config.{process,wait,logLevel}` block) match the configuration
//! documents consumed by the original probing tool.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime tuning knobs, nested under the `config` key of the document
///
/// ```yaml
/// config:
///   process: 4
///   wait: 0.5
///   logLevel: debug
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Number of concurrent workers (default: one per CPU)
    #[serde(default = "default_process")]
    pub process: usize,

    /// Per-worker delay between requests, in seconds (default: 0.5)
    ///
    /// The sleep is applied after each request by each worker, so the
    /// effective request rate is roughly `process / wait`.
    #[serde(default = "default_wait")]
    pub wait: f64,

    /// Log level for the rotating log file (default: "info")
    #[serde(default = "default_log_level", rename = "logLevel")]
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            process: default_process(),
            wait: default_wait(),
            log_level: default_log_level(),
        }
    }
}

/// Merged probing configuration
///
/// Defaults are overlaid by user-supplied values; see the module docs
/// for the external key names. Construct via [`Config::default`] plus
/// struct update syntax, or deserialize a YAML document with
/// [`Config::from_yaml_str`]. Call [`Config::validate`] (the engine
/// does this before spawning any worker) to enforce the invariants:
/// `result` non-empty, `process >= 1`, `wait` finite and non-negative.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Runtime tuning (concurrency, inter-request delay, log level)
    #[serde(default, rename = "config")]
    pub runtime: RuntimeConfig,

    /// URL scheme used when a target is a bare path (default: "https")
    #[serde(default = "default_scheme", rename = "proto")]
    pub scheme: String,

    /// Host used when a target is a bare path
    #[serde(default = "default_host", rename = "domain")]
    pub host: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent", rename = "user-agent")]
    pub user_agent: String,

    /// Ordered request header pairs; duplicates allowed and all sent
    #[serde(default, rename = "header")]
    pub headers: Vec<(String, String)>,

    /// Ordered cookie pairs, concatenated into a single Cookie header
    #[serde(default, rename = "cookie")]
    pub cookies: Vec<(String, String)>,

    /// Output field names; also defines the report column order
    ///
    /// Each entry is either a response header name, a transport metadata
    /// key, or an inline extraction marker (`m/<pattern>/`).
    #[serde(default = "default_output_fields", rename = "result")]
    pub output_fields: Vec<String>,

    /// External fetch command prefix (e.g. `"curl -sS"`)
    ///
    /// When set, requests are issued by spawning this command instead of
    /// the native HTTP client, and its output is run through the
    /// line-classification response parser.
    #[serde(default, rename = "command")]
    pub command_prefix: Option<String>,

    /// Skip TLS certificate validation (default: true, matching the
    /// original tool's `-k` behavior; set to false to validate)
    #[serde(default = "default_true")]
    pub insecure: bool,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory for per-worker response scratch files (default: "./scratch")
    ///
    /// Created at engine startup if missing. Cleaning up files from
    /// previous runs is the surrounding tool's responsibility.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Retry policy for transient transport failures
    ///
    /// Default is no retries: a failed target degrades its row and the
    /// batch continues.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            scheme: default_scheme(),
            host: default_host(),
            user_agent: default_user_agent(),
            headers: Vec::new(),
            cookies: Vec::new(),
            output_fields: default_output_fields(),
            command_prefix: None,
            insecure: true,
            timeout_secs: default_timeout_secs(),
            work_dir: default_work_dir(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Deserialize a YAML configuration document, merging it over the
    /// built-in defaults, and validate the result
    pub fn from_yaml_str(document: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration invariants
    ///
    /// A violation here is a global configuration failure: the engine
    /// refuses to start and no worker is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.output_fields.is_empty() {
            return Err(Error::config(
                "result must list at least one output field",
                Some("result"),
            ));
        }
        if self.runtime.process == 0 {
            return Err(Error::config(
                "config.process must be at least 1",
                Some("config.process"),
            ));
        }
        if !self.runtime.wait.is_finite() || self.runtime.wait < 0.0 {
            return Err(Error::config(
                format!(
                    "config.wait must be a non-negative number of seconds, got {}",
                    self.runtime.wait
                ),
                Some("config.wait"),
            ));
        }
        Ok(())
    }

    /// Per-worker delay between requests
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.runtime.wait)
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of concurrent workers
    pub fn concurrency(&self) -> usize {
        self.runtime.process
    }
}

/// Retry configuration for transient transport failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial try (default: 0 = no retries)
    #[serde(default)]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds (default: 500)
    #[serde(default = "default_retry_initial_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single retry delay, in milliseconds (default: 10000)
    #[serde(default = "default_retry_max_ms")]
    pub max_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to retry delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: default_retry_initial_ms(),
            max_delay_ms: default_retry_max_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before the first retry
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Upper bound on any single retry delay
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn default_process() -> usize {
    num_cpus::get().max(1)
}

fn default_wait() -> f64 {
    0.5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_user_agent() -> String {
    format!("urlprobe/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_fields() -> Vec<String> {
    vec!["http_code".to_string(), "time_total".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./scratch")
}

fn default_true() -> bool {
    true
}

fn default_retry_initial_ms() -> u64 {
    500
}

fn default_retry_max_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}
