// system-tests/tests/suites/live_endpoint.rs
// ============================================================================
// Module: Live Endpoint Tests
// Description: Built-in suite against the public posts service.
// Purpose: Confirm the simulated-mode contract holds against the real target.
// Dependencies: system-tests helpers, api-verify-core
// ============================================================================

//! Live endpoint coverage for API Verify system-tests.
//! Requires outbound network access; gated behind the `live-tests` feature.
//! `API_VERIFY_LIVE_BASE_URL` and `API_VERIFY_LIVE_BACKEND` pick the target.

use std::time::Duration;

use helpers::artifacts::TestReporter;
use helpers::harness::failed_scenarios;
use helpers::harness::run_posts_suite;
use helpers::timeouts::resolve_timeout;
use system_tests::config::SystemTestConfig;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn live_suite_passes_against_configured_target() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("live_suite_passes_against_configured_target")?;
    let config = SystemTestConfig::load()?;
    let timeout = resolve_timeout(Duration::from_secs(10));
    let target = config.live;
    let (report, sink) = run_posts_suite(&target.base_url, target.backend, timeout).await?;
    reporter.record_suite(&report, &sink)?;

    if !report.all_passed() {
        return Err(format!(
            "failed scenarios against {}: {:?}",
            target.base_url,
            failed_scenarios(&report)
        )
        .into());
    }

    reporter.finish("pass", vec![format!("target: {} ({} backend)", target.base_url, target.backend)])?;
    drop(reporter);
    Ok(())
}
