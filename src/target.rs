//! Target list handling
//!
//! A target is one opaque resource identifier to probe: either an
//! absolute URI or a path resolved against the configured scheme/host.
//! Target lists are newline-delimited text; blank lines and `#` comment
//! lines are skipped, and a literal `#__END__` line truncates the list.

use crate::error::Result;
use std::fmt;
use std::path::Path;

/// Marker line that truncates a target list; everything after is ignored
const END_MARKER: &str = "#__END__";

/// One resource identifier to probe
///
/// Immutable once read from the input list; consumed exactly once by a
/// worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target(String);

impl Target {
    /// Wrap a raw identifier string
    pub fn new(raw: impl Into<String>) -> Self {
        Target(raw.into())
    }

    /// The raw identifier as read from the input list
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Target::new(raw)
    }
}

/// Parse a newline-delimited target list
///
/// Blank lines and lines beginning with `#` are skipped. A literal
/// `#__END__` line truncates the list: everything after it is ignored.
/// Ordering of the surviving entries is preserved.
pub fn parse_target_list(text: &str) -> Vec<Target> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .take_while(|line| *line != END_MARKER)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Target::new)
        .collect()
}

/// Load a target list from a file
pub async fn load_targets(path: impl AsRef<Path>) -> Result<Vec<Target>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    let targets = parse_target_list(&text);
    tracing::debug!(
        path = %path.as_ref().display(),
        count = targets.len(),
        "Loaded target list"
    );
    Ok(targets)
}
