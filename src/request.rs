//! Request construction
//!
//! Turns one target plus the merged configuration into a fully
//! specified [`RequestSpec`]: final URL, ordered headers, synthesized
//! cookie header, the write-out metadata keys relevant to this report,
//! and the per-worker scratch file that captures the response body.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::target::Target;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Transport metadata keys a request may report
///
/// This is the fixed allow-list the write-out format is filtered
/// against: only keys that also appear in the configured output fields
/// are requested, so the written metadata stays minimal.
pub const WRITE_OUT_KEYS: &[&str] = &[
    "content_type",
    "errormsg",
    "exitcode",
    "filename_effective",
    "ftp_entry_path",
    "http_code",
    "http_connect",
    "http_version",
    "local_ip",
    "local_port",
    "method",
    "num_connects",
    "num_headers",
    "num_redirects",
    "onerror",
    "proxy_ssl_verify_result",
    "redirect_url",
    "referer",
    "remote_ip",
    "remote_port",
    "response_code",
    "scheme",
    "size_download",
    "size_header",
    "size_request",
    "size_upload",
    "speed_download",
    "speed_upload",
    "ssl_verify_result",
    "stderr",
    "stdout",
    "time_appconnect",
    "time_connect",
    "time_namelookup",
    "time_pretransfer",
    "time_redirect",
    "time_starttransfer",
    "time_total",
    "url",
    "url_effective",
    "urlnum",
];

/// Targets matching this are absolute URIs and used verbatim
static ABSOLUTE_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+://").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// A fully specified probe request
///
/// Built once per target by [`build`]; immutable afterwards. The worker
/// that built it owns the scratch path exclusively.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    /// Final request URL (verbatim absolute target, or composed from
    /// the configured scheme/host and the encoded target path)
    pub url: String,

    /// Ordered header pairs; duplicates preserved and all sent
    pub headers: Vec<(String, String)>,

    /// Synthesized Cookie header value (`name=value;` concatenation),
    /// absent when no cookies are configured
    pub cookie: Option<String>,

    /// User-Agent header value
    pub user_agent: String,

    /// Write-out metadata keys for this request: the fixed allow-list
    /// filtered by the configured output fields, configuration order
    pub write_out_keys: Vec<String>,

    /// Per-request scratch file capturing the response body; named by
    /// process id and worker index so concurrent workers never collide
    pub scratch_path: PathBuf,
}

/// Build a [`RequestSpec`] from the configuration and one target
///
/// Absolute-URI targets (`scheme://...`) are used verbatim; anything
/// else is percent-encoded (path separators preserved) and composed as
/// `{scheme}://{host}{path}`. A composed or verbatim URL that does not
/// parse is a per-target configuration error: the caller degrades that
/// row and the batch continues.
pub fn build(config: &Config, target: &Target, worker: usize) -> Result<RequestSpec> {
    let raw = target.as_str();
    if raw.is_empty() {
        return Err(Error::config("empty target", None));
    }

    let url = if ABSOLUTE_URI.is_match(raw) {
        raw.to_string()
    } else {
        let path = encode_path(raw);
        format!("{}://{}{}", config.scheme, config.host, path)
    };

    // Reject targets that cannot form a fetchable URL before any worker
    // wastes a transport round-trip on them
    url::Url::parse(&url)
        .map_err(|e| Error::config(format!("target {raw:?} yields invalid URL {url:?}: {e}"), None))?;

    let cookie = if config.cookies.is_empty() {
        None
    } else {
        Some(
            config
                .cookies
                .iter()
                .fold(String::new(), |acc, (name, value)| {
                    acc + &format!("{name}={value};")
                }),
        )
    };

    let write_out_keys = config
        .output_fields
        .iter()
        .filter(|field| WRITE_OUT_KEYS.contains(&field.as_str()))
        .cloned()
        .collect();

    Ok(RequestSpec {
        url,
        headers: config.headers.clone(),
        cookie,
        user_agent: config.user_agent.clone(),
        write_out_keys,
        scratch_path: config
            .work_dir
            .join(format!("probe-{}-{}", std::process::id(), worker)),
    })
}

impl RequestSpec {
    /// Render the argument vector for the external fetch tool
    ///
    /// Matches the invocation convention of curl-style fetchers: the
    /// response body goes to the scratch file, response headers are
    /// dumped to stdout, and each requested metadata key is written as
    /// a `KEY# VALUE` line so the response parser can tell it apart
    /// from header lines (`Key: Value`) and the status line.
    pub fn command_args(&self, insecure: bool) -> Vec<String> {
        let mut args = Vec::new();

        if insecure {
            args.push("--insecure".to_string());
        }

        args.push("--output".to_string());
        args.push(self.scratch_path.display().to_string());

        if let Some(cookie) = &self.cookie {
            args.push("--cookie".to_string());
            args.push(cookie.clone());
        }

        args.push("--user-agent".to_string());
        args.push(self.user_agent.clone());

        if !self.write_out_keys.is_empty() {
            let format = self
                .write_out_keys
                .iter()
                .fold(String::from("\n"), |acc, key| {
                    acc + &format!("{key}# %{{{key}}}\n")
                });
            args.push("--write-out".to_string());
            args.push(format);
        }

        for (name, value) in &self.headers {
            args.push("--header".to_string());
            args.push(format!("{name}: {value}"));
        }

        args.push("--dump-header".to_string());
        args.push("-".to_string());
        args.push(self.url.clone());

        args
    }
}

/// Percent-encode a target path, keeping `/` separators intact
fn encode_path(path: &str) -> String {
    urlencoding::encode(path).replace("%2F", "/")
}
