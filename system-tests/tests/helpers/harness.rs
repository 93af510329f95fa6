// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Suite Harness
// Description: Wires HTTP runners to stub or live endpoints.
// Purpose: Keep runner construction identical across system-test suites.
// Dependencies: api-verify-core
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use api_verify_core::BackendMode;
use api_verify_core::HttpTransport;
use api_verify_core::MemoryEventSink;
use api_verify_core::PostsClient;
use api_verify_core::RunEventSink;
use api_verify_core::SuiteReport;
use api_verify_core::SuiteRunner;
use api_verify_core::posts_suite;

/// Resource path served by the stub and the public endpoint.
pub const RESOURCE_PATH: &str = "/posts";

/// Builds a runner bound to `base_url` with an in-memory event sink.
pub fn http_runner(
    base_url: &str,
    mode: BackendMode,
    timeout: Duration,
) -> Result<(SuiteRunner<HttpTransport>, Arc<MemoryEventSink>), String> {
    let transport = HttpTransport::new(base_url, timeout).map_err(|err| err.to_string())?;
    let sink = Arc::new(MemoryEventSink::new());
    let runner = SuiteRunner::new(PostsClient::new(transport, RESOURCE_PATH), mode)
        .with_sink(Arc::clone(&sink) as Arc<dyn RunEventSink>);
    Ok((runner, sink))
}

/// Runs the built-in suite against `base_url`.
pub async fn run_posts_suite(
    base_url: &str,
    mode: BackendMode,
    timeout: Duration,
) -> Result<(SuiteReport, Arc<MemoryEventSink>), String> {
    let (runner, sink) = http_runner(base_url, mode, timeout)?;
    let report = runner.run(&posts_suite()).await.map_err(|err| err.to_string())?;
    Ok((report, sink))
}

/// Returns the names of scenarios that did not pass.
pub fn failed_scenarios(report: &SuiteReport) -> Vec<String> {
    report
        .scenarios
        .iter()
        .filter(|verdict| !verdict.passed())
        .map(|verdict| verdict.name.clone())
        .collect()
}
