//! Output field resolution
//!
//! Each configured output field name compiles once, at engine startup,
//! into a chain of tagged [`FieldSpec`] steps. Resolution walks the
//! chain against one [`ParsedResponse`] snapshot and always produces a
//! string, so every row has exactly one value per configured field.
//!
//! Two shapes of field name exist:
//!
//! - A plain name, looked up first in the response header namespace and
//!   then in the transport metadata namespace (header wins on a name
//!   collision), falling back to the `N/A` sentinel.
//! - An inline extraction marker `m<delim><pattern><delim>` — a single
//!   arbitrary delimiter character, identical at both ends, enclosing a
//!   case-insensitive regular expression applied to the response body.
//!   The first capture group of the first match is taken (whole match
//!   when the pattern has no group); a body with no match resolves to
//!   the empty string, and an absent body to `N/A`.

use crate::error::{Error, Result};
use crate::parse::ParsedResponse;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Sentinel value for fields that cannot be resolved
pub const NOT_AVAILABLE: &str = "N/A";

/// Shape of an inline extraction marker: `m<delim><pattern><delim>`
static EXTRACTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^m(.)(.+)(.)$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// One step of a field resolution chain
#[derive(Clone, Debug)]
pub enum FieldSpec {
    /// Exact lookup in the response header namespace
    Header(String),
    /// Exact lookup in the transport metadata namespace
    Metadata(String),
    /// Regex extraction from the response body
    Extract {
        /// Case-insensitive pattern applied to the body
        pattern: Regex,
        /// Capture group index taken from the first match (0 = whole match)
        group: usize,
    },
    /// Fixed fallback text
    Literal(String),
}

/// A compiled output field: the configured name plus its resolution chain
#[derive(Clone, Debug)]
pub struct CompiledField {
    name: String,
    chain: Vec<FieldSpec>,
}

impl CompiledField {
    /// Compile one configured field name
    ///
    /// An extraction marker with an invalid enclosed regex is a global
    /// configuration error: compilation happens before any worker runs,
    /// so a bad pattern is caught at startup rather than per row.
    pub fn compile(name: &str) -> Result<Self> {
        let chain = match parse_marker(name) {
            Some(enclosed) => {
                let pattern = RegexBuilder::new(enclosed)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        Error::config(
                            format!("invalid extraction pattern in field {name:?}: {e}"),
                            Some("result"),
                        )
                    })?;
                let group = if pattern.captures_len() > 1 { 1 } else { 0 };
                vec![
                    FieldSpec::Extract { pattern, group },
                    FieldSpec::Literal(NOT_AVAILABLE.to_string()),
                ]
            }
            None => vec![
                FieldSpec::Header(name.to_string()),
                FieldSpec::Metadata(name.to_string()),
                FieldSpec::Literal(NOT_AVAILABLE.to_string()),
            ],
        };

        Ok(CompiledField {
            name: name.to_string(),
            chain,
        })
    }

    /// The configured field name (report column heading)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve this field against one parsed response
    ///
    /// Deterministic and total: the same snapshot always yields the
    /// same string, and some string is always produced.
    pub fn resolve(&self, parsed: &ParsedResponse) -> String {
        for step in &self.chain {
            match step {
                FieldSpec::Header(name) => {
                    if let Some(value) = parsed.headers.get(name) {
                        return value.clone();
                    }
                }
                FieldSpec::Metadata(name) => {
                    if let Some(value) = parsed.metadata.get(name) {
                        return value.clone();
                    }
                }
                FieldSpec::Extract { pattern, group } => {
                    // No body: fall through to the sentinel. Body with
                    // no match: resolves to empty, per the extraction
                    // contract.
                    if let Some(body) = &parsed.body {
                        return match pattern.captures(body) {
                            Some(caps) => caps
                                .get(*group)
                                .map(|m| m.as_str().to_string())
                                .unwrap_or_default(),
                            None => String::new(),
                        };
                    }
                }
                FieldSpec::Literal(text) => return text.clone(),
            }
        }

        // Chains always end in a Literal; this is unreachable in practice
        NOT_AVAILABLE.to_string()
    }
}

/// Compile every configured output field, preserving order
pub fn compile_fields(names: &[String]) -> Result<Vec<CompiledField>> {
    names.iter().map(|name| CompiledField::compile(name)).collect()
}

/// Recognize `m<delim><pattern><delim>` and return the enclosed pattern
fn parse_marker(name: &str) -> Option<&str> {
    let caps = EXTRACTION_MARKER.captures(name)?;
    // Opening and closing delimiter must be the same single character
    if caps[1] != caps[3] {
        return None;
    }
    caps.get(2).map(|m| m.as_str())
}
