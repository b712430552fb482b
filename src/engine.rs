//! Probing engine — bounded worker pool over a shared target queue
//!
//! [`Engine::run`] executes one closed batch: every worker repeatedly
//! pops a target from the shared queue, runs the Builder → Transport
//! (→ Parser) → Resolver pipeline, appends exactly one row to the
//! shared result collection, then honors the configured inter-request
//! delay. The queue and the result sink are the only shared mutable
//! state; scratch files are namespaced per worker.
//!
//! Per-target failures never abort the batch: a target that fails at
//! any stage still yields one row, with the `N/A` sentinel in every
//! field the failed stage would have supplied.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::field::{self, CompiledField};
use crate::parse::ParsedResponse;
use crate::request;
use crate::retry;
use crate::target::Target;
use crate::transport::{CommandTransport, HttpTransport, Transport};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One row of resolved output values, in `output_fields` order
pub type ResultRow = Vec<String>;

/// Ordered collection of result rows from one batch
///
/// Append-only during the run; read by the reporter only after all
/// workers have joined. Row order across workers is unspecified, but
/// each row's columns come from one consistent response snapshot.
#[derive(Clone, Debug, Default)]
pub struct ResultSet {
    rows: Vec<ResultRow>,
}

impl ResultSet {
    /// The collected rows, in storage order
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of collected rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch produced no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Concurrent HTTP probing engine
///
/// Construction validates the configuration and compiles the output
/// fields; both happen before any worker is spawned, so an invalid
/// configuration fails the whole run up front instead of mid-batch.
pub struct Engine {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    fields: Arc<Vec<CompiledField>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from the merged configuration
    ///
    /// Selects the transport: the native HTTP client by default, or the
    /// external fetch tool when the configuration sets a `command`
    /// prefix.
    pub fn new(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = if config.command_prefix.is_some() {
            Arc::new(CommandTransport::new(&config)?)
        } else {
            Arc::new(HttpTransport::new(&config)?)
        };
        Self::with_transport(config, transport)
    }

    /// Build an engine with a caller-supplied transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let fields = field::compile_fields(&config.output_fields)?;

        Ok(Self {
            config: Arc::new(config),
            transport,
            fields: Arc::new(fields),
        })
    }

    /// The merged configuration this engine runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one batch over the given targets
    ///
    /// Returns once the queue is drained and every worker has joined.
    /// The result set holds exactly one row per submitted target.
    pub async fn run(&self, targets: Vec<Target>) -> Result<ResultSet> {
        // Scratch files land here; missing directory would otherwise
        // surface as a confusing per-row capture warning
        tokio::fs::create_dir_all(&self.config.work_dir).await?;

        let total = targets.len();
        let worker_count = self.config.concurrency().min(total.max(1));
        tracing::info!(
            targets = total,
            workers = worker_count,
            transport = self.transport.name(),
            "Starting probe batch"
        );

        let queue = Arc::new(Mutex::new(targets.into_iter().collect::<VecDeque<_>>()));
        let results: Arc<Mutex<Vec<ResultRow>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let mut handles = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let config = Arc::clone(&self.config);
            let transport = Arc::clone(&self.transport);
            let fields = Arc::clone(&self.fields);

            handles.push(tokio::spawn(async move {
                loop {
                    // Pop under the lock, probe outside it: one worker's
                    // in-flight request never blocks another's pop
                    let target = {
                        let mut queue = queue.lock().await;
                        queue.pop_front()
                    };
                    let Some(target) = target else {
                        break;
                    };

                    let row = probe_one(&config, &transport, &fields, &target, worker).await;
                    results.lock().await.push(row);

                    let delay = config.request_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }));
        }

        for handle in handles {
            handle
                .await
                .map_err(|e| Error::WorkerJoin(e.to_string()))?;
        }

        let rows = Arc::try_unwrap(results)
            .map_err(|_| Error::WorkerJoin("result sink still shared after join".to_string()))?
            .into_inner();

        tracing::info!(rows = rows.len(), "Probe batch complete");
        Ok(ResultSet { rows })
    }
}

/// Run the full pipeline for one target, degrading instead of failing
///
/// Build or transport failures are logged and leave the parsed snapshot
/// empty, so every configured field falls back to its sentinel; the
/// target still contributes exactly one row.
async fn probe_one(
    config: &Config,
    transport: &Arc<dyn Transport>,
    fields: &[CompiledField],
    target: &Target,
    worker: usize,
) -> ResultRow {
    let parsed = match request::build(config, target, worker) {
        Ok(spec) => {
            tracing::debug!(worker, target = %target, url = %spec.url, "Probing target");
            let fetched = retry::fetch_with_retry(&config.retry, || transport.fetch(&spec)).await;
            match fetched {
                Ok(parsed) => {
                    tracing::debug!(
                        worker,
                        target = %target,
                        headers = ?parsed.headers,
                        metadata = ?parsed.metadata,
                        body_len = parsed.body.as_ref().map(String::len),
                        "Parsed response"
                    );
                    parsed
                }
                Err(e) => {
                    tracing::error!(worker, target = %target, error = %e, "Transport failed; row degraded");
                    ParsedResponse::default()
                }
            }
        }
        Err(e) => {
            tracing::error!(worker, target = %target, error = %e, "Request build failed; row degraded");
            ParsedResponse::default()
        }
    };

    fields.iter().map(|field| field.resolve(&parsed)).collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::request::RequestSpec;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport stub: answers from a canned table, fails on demand
    struct StubTransport {
        responses: HashMap<String, ParsedResponse>,
        fail_urls: Vec<String>,
        calls: AtomicUsize,
    }

    impl StubTransport {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                fail_urls: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn respond(mut self, url: &str, parsed: ParsedResponse) -> Self {
            self.responses.insert(url.to_string(), parsed);
            self
        }

        fn fail_on(mut self, url: &str) -> Self {
            self.fail_urls.push(url.to_string());
            self
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn fetch(
            &self,
            spec: &RequestSpec,
        ) -> std::result::Result<ParsedResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_urls.contains(&spec.url) {
                return Err(TransportError::Timeout {
                    url: spec.url.clone(),
                    seconds: 1,
                });
            }
            Ok(self.responses.get(&spec.url).cloned().unwrap_or_default())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn ok_response(code: &str) -> ParsedResponse {
        ParsedResponse {
            headers: HashMap::from([("content-type".to_string(), "text/html".to_string())]),
            metadata: HashMap::from([("http_code".to_string(), code.to_string())]),
            body: Some(format!("<html>Status: Active code {code}</html>")),
        }
    }

    fn test_config(process: usize) -> Config {
        let mut config = Config {
            scheme: "https".to_string(),
            host: "probe.test".to_string(),
            output_fields: vec![
                "http_code".to_string(),
                "content-type".to_string(),
                r"m/status:\s*(\w+)/".to_string(),
            ],
            work_dir: std::env::temp_dir(),
            ..Default::default()
        };
        config.runtime.process = process;
        config.runtime.wait = 0.0;
        config
    }

    fn url_for(path: &str) -> String {
        format!("https://probe.test{path}")
    }

    #[tokio::test]
    async fn every_target_yields_exactly_one_row() {
        let transport = StubTransport::new()
            .respond(&url_for("/1"), ok_response("200"))
            .respond(&url_for("/2"), ok_response("301"))
            .respond(&url_for("/3"), ok_response("404"));
        let engine = Engine::with_transport(test_config(2), Arc::new(transport)).unwrap();

        let results = engine
            .run(vec![Target::new("/1"), Target::new("/2"), Target::new("/3")])
            .await
            .unwrap();

        assert_eq!(results.len(), 3, "no target dropped, none duplicated");
        for row in results.rows() {
            assert_eq!(row.len(), 3, "one column per configured field");
        }
    }

    #[tokio::test]
    async fn transport_failure_degrades_only_its_row() {
        // Five targets, two workers, no delay; target 3 fails at the
        // transport stage
        let transport = StubTransport::new()
            .respond(&url_for("/1"), ok_response("200"))
            .respond(&url_for("/2"), ok_response("200"))
            .fail_on(&url_for("/3"))
            .respond(&url_for("/4"), ok_response("200"))
            .respond(&url_for("/5"), ok_response("200"));
        let engine = Engine::with_transport(test_config(2), Arc::new(transport)).unwrap();

        let targets: Vec<Target> = (1..=5).map(|i| Target::new(format!("/{i}"))).collect();
        let results = engine.run(targets).await.unwrap();

        assert_eq!(results.len(), 5);
        let degraded: Vec<&ResultRow> = results
            .rows()
            .iter()
            .filter(|row| row.iter().all(|cell| cell == "N/A"))
            .collect();
        assert_eq!(
            degraded.len(),
            1,
            "exactly the failed target degrades, every field to the sentinel"
        );
        let healthy = results
            .rows()
            .iter()
            .filter(|row| row[0] == "200")
            .count();
        assert_eq!(healthy, 4);
    }

    #[tokio::test]
    async fn unbuildable_target_still_yields_a_degraded_row() {
        let mut config = test_config(1);
        config.host = String::new(); // composed URLs cannot parse
        let transport = StubTransport::new();
        let engine = Engine::with_transport(config, Arc::new(transport)).unwrap();

        let results = engine.run(vec![Target::new("/x")]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.rows()[0].iter().all(|cell| cell == "N/A"));
    }

    #[tokio::test]
    async fn row_columns_follow_output_field_order() {
        let transport = StubTransport::new().respond(&url_for("/1"), ok_response("200"));
        let engine = Engine::with_transport(test_config(1), Arc::new(transport)).unwrap();

        let results = engine.run(vec![Target::new("/1")]).await.unwrap();
        let row = &results.rows()[0];
        assert_eq!(row[0], "200", "metadata column");
        assert_eq!(row[1], "text/html", "header column");
        assert_eq!(row[2], "Active", "extraction column");
    }

    #[tokio::test]
    async fn empty_target_list_completes_with_no_rows() {
        let engine =
            Engine::with_transport(test_config(4), Arc::new(StubTransport::new())).unwrap();
        let results = engine.run(Vec::new()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn invalid_configuration_fails_before_any_worker_runs() {
        let mut config = test_config(1);
        config.output_fields.clear();
        let err = Engine::with_transport(config, Arc::new(StubTransport::new())).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn invalid_extraction_pattern_fails_at_construction() {
        let mut config = test_config(1);
        config.output_fields = vec!["m/(broken/".to_string()];
        let err = Engine::with_transport(config, Arc::new(StubTransport::new())).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn concurrency_is_capped_by_target_count() {
        // 8 workers configured but only 2 targets: the pool must not
        // spawn idle workers that fight over an empty queue
        let transport = StubTransport::new()
            .respond(&url_for("/1"), ok_response("200"))
            .respond(&url_for("/2"), ok_response("200"));
        let engine = Engine::with_transport(test_config(8), Arc::new(transport)).unwrap();

        let results = engine
            .run(vec![Target::new("/1"), Target::new("/2")])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn absolute_targets_bypass_scheme_host_composition() {
        let transport =
            StubTransport::new().respond("http://elsewhere.test/z", ok_response("200"));
        let engine = Engine::with_transport(test_config(1), Arc::new(transport)).unwrap();

        let results = engine
            .run(vec![Target::new("http://elsewhere.test/z")])
            .await
            .unwrap();
        assert_eq!(results.rows()[0][0], "200");
    }
}
