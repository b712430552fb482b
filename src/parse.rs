//! Response parsing
//!
//! Splits the raw output of a command-based fetch into the three
//! informational layers of a probe: response headers, transport
//! metadata, and (for textual markup responses) the body captured in
//! the worker's scratch file.
//!
//! Each output line is classified by the first matching pattern:
//!
//! 1. HTTP status line (`HTTP/<version> <code>`) — confirms a response
//!    arrived, otherwise discarded.
//! 2. Metadata line (`KEY# VALUE`) — transport metadata namespace.
//! 3. Header line (`Key: Value`) — response header namespace.
//! 4. Anything else (blank lines, body fragments) — ignored.
//!
//! Duplicate keys within a namespace are last-write-wins.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^HTTP/\S+ \d{3}(?: .*)?$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

static METADATA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)# (.+)$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+): (.+)$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Content types whose bodies count as textual markup
static TEXTUAL_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:text/(?:html|xml)|application/xhtml\+xml)")
        .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Raw result of one command-based transport execution
///
/// Ephemeral: owned solely by the worker that produced it and consumed
/// by [`parse`].
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// Process exit code (`-1` when terminated by a signal)
    pub exit_code: i32,
    /// Captured standard output (dumped headers + write-out lines)
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// One response split into its three informational layers
///
/// Derived once per probe and immutable thereafter; every column of the
/// corresponding result row is resolved against this one snapshot.
#[derive(Clone, Debug, Default)]
pub struct ParsedResponse {
    /// Response header namespace (name → value, case as received,
    /// last-write-wins on duplicates)
    pub headers: HashMap<String, String>,
    /// Transport metadata namespace (write-out key → value)
    pub metadata: HashMap<String, String>,
    /// Response body, present only for textual markup content types
    pub body: Option<String>,
}

impl ParsedResponse {
    /// Whether the configured content type counts as textual markup
    ///
    /// The lookup is case-insensitive on the header name so both the
    /// native transport (lowercased names) and external tools
    /// (case as received) are covered.
    pub fn is_textual_markup(&self) -> bool {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .is_some_and(|(_, value)| TEXTUAL_MARKUP.is_match(value))
    }
}

/// Check whether a content-type value counts as textual markup
pub fn is_markup_content_type(value: &str) -> bool {
    TEXTUAL_MARKUP.is_match(value)
}

/// Parse raw transport output into a [`ParsedResponse`]
///
/// When the parsed headers indicate a textual markup body, the scratch
/// file is read into `body`. A missing or unreadable scratch file is
/// logged as a warning and leaves the body absent; extraction fields
/// for that row then resolve to the `N/A` sentinel while header and
/// metadata fields resolve normally.
pub fn parse(raw: &RawResponse, scratch_path: &Path) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();

    for line in raw.stdout.lines() {
        let line = line.trim_end_matches('\r');

        if STATUS_LINE.is_match(line) {
            continue;
        }

        if let Some(caps) = METADATA_LINE.captures(line) {
            parsed
                .metadata
                .insert(caps[1].to_string(), caps[2].to_string());
            continue;
        }

        if let Some(caps) = HEADER_LINE.captures(line) {
            parsed.headers.insert(caps[1].to_string(), caps[2].to_string());
            continue;
        }

        // Blank line or body fragment: not part of any namespace
    }

    if parsed.is_textual_markup() {
        match std::fs::read_to_string(scratch_path) {
            Ok(contents) => parsed.body = Some(contents),
            Err(e) => {
                tracing::warn!(
                    path = %scratch_path.display(),
                    error = %e,
                    "Markup response expected but scratch file unreadable; body treated as absent"
                );
            }
        }
    }

    parsed
}
