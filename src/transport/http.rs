//! Native HTTP transport
//!
//! Issues probe requests with a shared `reqwest` client and fills the
//! three response namespaces directly from the structured response, so
//! no text re-parsing is involved. Transport metadata is restricted to
//! the write-out keys the request asked for, keeping rows minimal.

use crate::config::Config;
use crate::error::{Result, TransportError};
use crate::parse::{self, ParsedResponse};
use crate::request::RequestSpec;
use crate::transport::Transport;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::time::Instant;

/// Native HTTP client transport
pub struct HttpTransport {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Build a transport from the probing configuration
    ///
    /// The client is constructed once and shared by all workers. TLS
    /// certificate validation is skipped only when `insecure` is set in
    /// the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, spec: &RequestSpec) -> std::result::Result<ParsedResponse, TransportError> {
        let mut request = self.client.get(&spec.url);

        let mut header_map = HeaderMap::new();
        for (name, value) in &spec.headers {
            // A malformed configured header should not silently drop
            // the request; append what parses and log the rest
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    header_map.append(name, value);
                }
                _ => {
                    tracing::warn!(header = %name, "Skipping header that is not valid HTTP");
                }
            }
        }
        if let Some(cookie) = &spec.cookie
            && let Ok(value) = HeaderValue::from_str(cookie)
        {
            header_map.append(reqwest::header::COOKIE, value);
        }
        request = request.headers(header_map);

        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: spec.url.clone(),
                    seconds: self.timeout_secs,
                }
            } else {
                TransportError::Network {
                    url: spec.url.clone(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        let version = response.version();
        let remote_addr = response.remote_addr();
        let url_effective = response.url().to_string();
        let scheme = response.url().scheme().to_uppercase();

        // Header namespace: names are lowercased by the HTTP machinery;
        // duplicates collapse last-write-wins
        let mut headers: HashMap<String, String> = HashMap::new();
        let mut header_bytes = 0usize;
        let header_count = response.headers().len();
        for (name, value) in response.headers() {
            header_bytes += name.as_str().len() + value.len() + 4;
            if let Ok(text) = value.to_str() {
                headers.insert(name.as_str().to_string(), text.to_string());
            }
        }

        let content_type = headers.get("content-type").cloned();

        let body_bytes = response.bytes().await.map_err(|e| TransportError::Network {
            url: spec.url.clone(),
            source: e,
        })?;
        let elapsed = started.elapsed();

        // Metadata namespace: only the keys this report asked for, and
        // only those the native client can observe
        let mut metadata = HashMap::new();
        for key in &spec.write_out_keys {
            let value = match key.as_str() {
                "http_code" | "response_code" => Some(status.as_u16().to_string()),
                "content_type" => content_type.clone(),
                "http_version" => Some(format!("{version:?}")),
                "method" => Some("GET".to_string()),
                "scheme" => Some(scheme.clone()),
                "remote_ip" => remote_addr.map(|a| a.ip().to_string()),
                "remote_port" => remote_addr.map(|a| a.port().to_string()),
                "num_headers" => Some(header_count.to_string()),
                "size_download" => Some(body_bytes.len().to_string()),
                "size_header" => Some(header_bytes.to_string()),
                "time_total" => Some(format!("{:.6}", elapsed.as_secs_f64())),
                "speed_download" => {
                    let secs = elapsed.as_secs_f64();
                    (secs > 0.0).then(|| format!("{:.0}", body_bytes.len() as f64 / secs))
                }
                "url" => Some(spec.url.clone()),
                "url_effective" => Some(url_effective.clone()),
                "exitcode" => Some("0".to_string()),
                "errormsg" => Some(String::new()),
                // Keys only an external fetch tool reports; the field
                // resolver falls back to the sentinel for them
                _ => None,
            };
            if let Some(value) = value {
                metadata.insert(key.clone(), value);
            }
        }

        // Body only for textual markup, mirroring the parser contract;
        // the capture also lands in the scratch file so the response
        // can be inspected after the run
        let body = match content_type {
            Some(ct) if parse::is_markup_content_type(&ct) => {
                let text = String::from_utf8_lossy(&body_bytes).into_owned();
                if let Err(e) = std::fs::write(&spec.scratch_path, &text) {
                    tracing::warn!(
                        path = %spec.scratch_path.display(),
                        error = %e,
                        "Failed to write response capture"
                    );
                }
                Some(text)
            }
            _ => None,
        };

        Ok(ParsedResponse {
            headers,
            metadata,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
