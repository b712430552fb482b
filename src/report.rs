//! Report rendering
//!
//! Pure formatting: turns the aggregated result set into an aligned
//! plain-text table, one column per configured output field (in
//! configuration order) and one row per probed target (in result
//! storage order).

use crate::engine::ResultSet;

/// Gap between adjacent columns
const COLUMN_GAP: &str = "  ";

/// Render the result set as an aligned text table
///
/// The header row lists the configured field names, followed by a
/// dashed separator and the data rows. Rows shorter than the header
/// (which the engine never produces) render their missing cells empty
/// rather than panicking.
pub fn render(output_fields: &[String], results: &ResultSet) -> String {
    let mut widths: Vec<usize> = output_fields.iter().map(|name| name.len()).collect();
    for row in results.rows() {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    push_row(&mut out, output_fields.iter().map(String::as_str), &widths);

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, separator.iter().map(String::as_str), &widths);

    for row in results.rows() {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }

    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut cells: Vec<&str> = cells.collect();
    cells.resize(widths.len(), "");

    let last = widths.len().saturating_sub(1);
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i < last {
            out.push_str(&format!("{cell:<width$}{COLUMN_GAP}"));
        } else {
            // No trailing padding on the last column
            out.push_str(cell);
        }
    }
    out.push('\n');
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::Engine;
    use crate::error::TransportError;
    use crate::parse::ParsedResponse;
    use crate::request::RequestSpec;
    use crate::target::Target;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FixedTransport(ParsedResponse);

    #[async_trait]
    impl Transport for FixedTransport {
        async fn fetch(&self, _spec: &RequestSpec) -> Result<ParsedResponse, TransportError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    async fn one_row_results(fields: &[&str], code: &str) -> (Vec<String>, ResultSet) {
        let mut config = Config {
            host: "probe.test".to_string(),
            output_fields: fields.iter().map(|f| f.to_string()).collect(),
            work_dir: std::env::temp_dir(),
            ..Default::default()
        };
        config.runtime.process = 1;
        config.runtime.wait = 0.0;

        let parsed = ParsedResponse {
            headers: HashMap::new(),
            metadata: HashMap::from([("http_code".to_string(), code.to_string())]),
            body: None,
        };
        let engine = Engine::with_transport(config.clone(), Arc::new(FixedTransport(parsed))).unwrap();
        let results = engine.run(vec![Target::new("/a")]).await.unwrap();
        (config.output_fields, results)
    }

    #[tokio::test]
    async fn header_separator_and_rows_are_rendered() {
        let (fields, results) = one_row_results(&["http_code", "server"], "200").await;
        let table = render(&fields, &results);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3, "header + separator + one row");
        assert_eq!(lines[0], "http_code  server");
        assert_eq!(lines[1], "---------  ------");
        assert_eq!(lines[2], "200        N/A");
    }

    #[tokio::test]
    async fn columns_widen_to_fit_cell_values() {
        let (fields, results) = one_row_results(&["c"], "a-rather-long-value").await;
        let table = render(&fields, &results);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1], "-".repeat("a-rather-long-value".len()));
    }

    #[test]
    fn empty_result_set_renders_header_only() {
        let fields = vec!["http_code".to_string()];
        let table = render(&fields, &ResultSet::default());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines, vec!["http_code", "---------"]);
    }
}
