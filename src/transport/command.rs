//! External fetch tool transport
//!
//! Spawns a curl-style command per request and hands its combined
//! output to the line-classification parser. Selected by setting the
//! `command` prefix in the configuration (e.g. `"curl -sS"`).
//!
//! A non-zero exit is not an error at this level: the stderr detail is
//! logged and whatever output was produced still goes through the
//! parser, so partially successful fetches keep contributing fields.

use crate::config::Config;
use crate::error::{Error, Result, TransportError};
use crate::parse::{self, ParsedResponse, RawResponse};
use crate::request::RequestSpec;
use crate::transport::Transport;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Transport that shells out to an external fetch tool
#[derive(Debug)]
pub struct CommandTransport {
    program: String,
    base_args: Vec<String>,
    insecure: bool,
    timeout: Duration,
}

impl CommandTransport {
    /// Build a transport from the configured command prefix
    ///
    /// The prefix is split on whitespace: first token is the program,
    /// the rest are leading arguments kept before the per-request ones.
    pub fn new(config: &Config) -> Result<Self> {
        let prefix = config.command_prefix.as_deref().unwrap_or_default();
        let mut tokens = prefix.split_whitespace().map(String::from);
        let program = tokens.next().ok_or_else(|| {
            Error::config("command prefix must name a fetch program", Some("command"))
        })?;

        Ok(Self {
            program,
            base_args: tokens.collect(),
            insecure: config.insecure,
            timeout: config.timeout(),
        })
    }

    /// Run the fetch command, bounded by the configured timeout
    ///
    /// Returns the exit code and captured output even on failure; only
    /// spawn errors and timeouts surface as [`TransportError`].
    pub async fn execute(&self, spec: &RequestSpec) -> std::result::Result<RawResponse, TransportError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(spec.command_args(self.insecure))
            .kill_on_drop(true);

        tracing::debug!(program = %self.program, url = %spec.url, "Spawning fetch command");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| TransportError::Timeout {
                url: spec.url.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| TransportError::Spawn {
                command: self.program.clone(),
                source: e,
            })?;

        let raw = RawResponse {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            tracing::error!(
                url = %spec.url,
                exit_code = raw.exit_code,
                stderr = %raw.stderr.trim_end(),
                "Fetch command exited non-zero; continuing with partial output"
            );
        }

        Ok(raw)
    }
}

#[async_trait]
impl Transport for CommandTransport {
    async fn fetch(&self, spec: &RequestSpec) -> std::result::Result<ParsedResponse, TransportError> {
        let raw = self.execute(spec).await?;
        Ok(parse::parse(&raw, &spec.scratch_path))
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::request;
    use crate::target::Target;

    fn command_config(prefix: &str) -> Config {
        Config {
            command_prefix: Some(prefix.to_string()),
            output_fields: vec!["http_code".to_string()],
            work_dir: std::env::temp_dir(),
            ..Default::default()
        }
    }

    #[test]
    fn prefix_splits_into_program_and_args() {
        let transport = CommandTransport::new(&command_config("curl -sS")).unwrap();
        assert_eq!(transport.program, "curl");
        assert_eq!(transport.base_args, vec!["-sS"]);
    }

    #[test]
    fn empty_prefix_is_a_config_error() {
        let err = CommandTransport::new(&command_config("  ")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let config = command_config("definitely-not-a-real-fetch-tool-xyz");
        let transport = CommandTransport::new(&config).unwrap();
        let spec = request::build(&config, &Target::new("https://example.com/"), 0).unwrap();

        let err = transport.execute(&spec).await.unwrap_err();
        assert!(matches!(err, TransportError::Spawn { .. }));
    }

    #[tokio::test]
    async fn nonzero_exit_still_yields_raw_output() {
        // `false` ignores its arguments and exits 1 without output
        let config = command_config("false");
        let transport = CommandTransport::new(&config).unwrap();
        let spec = request::build(&config, &Target::new("https://example.com/"), 0).unwrap();

        let raw = transport.execute(&spec).await.unwrap();
        assert_eq!(raw.exit_code, 1);
        assert!(raw.stdout.is_empty());
    }

    #[tokio::test]
    async fn fetch_parses_command_output() {
        // Use `echo` as a stand-in fetch tool: with no write-out keys
        // requested, its output (the argument vector) contains no
        // classifiable lines, so both namespaces stay empty but the
        // pipeline completes
        let mut config = command_config("echo");
        config.output_fields = vec!["content-type".to_string()];
        let transport = CommandTransport::new(&config).unwrap();
        let spec = request::build(&config, &Target::new("https://example.com/"), 0).unwrap();

        let parsed = transport.fetch(&spec).await.unwrap();
        assert!(parsed.metadata.is_empty());
        assert!(parsed.body.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_command_is_bounded_by_timeout() {
        use std::os::unix::fs::PermissionsExt;

        // A fetch tool that never responds, regardless of arguments
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("hang.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 600\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = command_config(script.to_str().unwrap());
        config.timeout_secs = 1;
        let transport = CommandTransport::new(&config).unwrap();
        let spec = request::build(&config, &Target::new("https://example.com/"), 0).unwrap();

        let err = transport.execute(&spec).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }
}
