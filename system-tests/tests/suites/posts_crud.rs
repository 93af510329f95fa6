// system-tests/tests/suites/posts_crud.rs
// ============================================================================
// Module: Posts CRUD Tests
// Description: Built-in suite runs over HTTP against the posts stub.
// Purpose: Validate both backend modes and durability expectations end to end.
// Dependencies: system-tests helpers, api-verify-core
// ============================================================================

//! Posts CRUD coverage for API Verify system-tests.

use std::fs;
use std::time::Duration;

use api_verify_core::BackendMode;
use api_verify_core::RunEventKind;
use api_verify_core::StepStatus;
use helpers::artifacts::TestReporter;
use helpers::harness::failed_scenarios;
use helpers::harness::run_posts_suite;
use helpers::posts_stub::spawn_posts_stub;
use helpers::timeouts::resolve_timeout;
use serde_json::Value;
use serde_json::json;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn suite_passes_against_simulated_stub() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("suite_passes_against_simulated_stub")?;
    let stub = spawn_posts_stub(BackendMode::Simulated).await?;
    let timeout = resolve_timeout(Duration::from_secs(5));
    let (report, sink) = run_posts_suite(stub.base_url(), BackendMode::Simulated, timeout).await?;
    reporter.record_suite(&report, &sink)?;

    if !report.all_passed() {
        return Err(format!("failed scenarios: {:?}", failed_scenarios(&report)).into());
    }
    if report.total != 7 {
        return Err(format!("expected 7 scenarios, got {}", report.total).into());
    }
    let requests = stub.requests();
    if requests.len() != 10 {
        return Err(format!("expected 10 requests, got {}", requests.len()).into());
    }
    if stub.stored(101).is_some() {
        return Err("simulated stub stored a created post".into());
    }
    let created = report
        .scenario("creates-post")
        .and_then(|verdict| verdict.steps.get(1))
        .and_then(|step| step.path.clone());
    if created.as_deref() != Some("/posts/101") {
        return Err(format!("unexpected verify path {created:?}").into());
    }

    let written: Value = serde_json::from_slice(&fs::read(reporter.root().join("report.json"))?)?;
    if !written["duration_ms"].is_u64() || written["scenarios"][0]["duration_ms"].as_u64().is_none() {
        return Err(format!("report.json durations are not integers: {written}").into());
    }
    let events: Value = serde_json::from_slice(&fs::read(reporter.root().join("events.json"))?)?;
    let events = events.as_array().ok_or("events.json is not an array")?;
    if events.len() != sink.events().len() {
        return Err(format!("events.json holds {} of {} events", events.len(), sink.events().len()).into());
    }
    let numeric = events.iter().all(|event| {
        event["timestamp_ms"].is_u64()
            && (event["event"] == Value::from("scenario_started") || event["duration_ms"].is_u64())
    });
    if !numeric {
        return Err("events.json timestamps or durations are not integers".into());
    }

    reporter.finish("pass", vec!["simulated suite passed over http".to_string()])?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn suite_passes_against_persisting_stub() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("suite_passes_against_persisting_stub")?;
    let stub = spawn_posts_stub(BackendMode::Persisting).await?;
    let timeout = resolve_timeout(Duration::from_secs(5));
    let (report, sink) = run_posts_suite(stub.base_url(), BackendMode::Persisting, timeout).await?;
    reporter.record_suite(&report, &sink)?;

    if !report.all_passed() {
        return Err(format!("failed scenarios: {:?}", failed_scenarios(&report)).into());
    }
    let created = stub.stored(101).ok_or("created post was not stored")?;
    if created["title"] != json!("New Post Title") || created["userId"] != json!(100) {
        return Err(format!("unexpected stored post {created}").into());
    }
    if stub.stored(1).is_some() {
        return Err("deleted post is still stored".into());
    }
    let methods: Vec<String> = stub.requests().into_iter().map(|request| request.method).collect();
    let expected = ["GET", "GET", "GET", "GET", "POST", "GET", "PUT", "GET", "DELETE", "GET"];
    if methods != expected {
        return Err(format!("unexpected request order {methods:?}").into());
    }

    reporter.finish("pass", vec!["persisting suite passed over http".to_string()])?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_mode_fails_durability_scenarios() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mismatched_mode_fails_durability_scenarios")?;
    let timeout = resolve_timeout(Duration::from_secs(5));
    let mut notes = Vec::new();
    for (stub_mode, runner_mode) in [
        (BackendMode::Persisting, BackendMode::Simulated),
        (BackendMode::Simulated, BackendMode::Persisting),
    ] {
        let stub = spawn_posts_stub(stub_mode).await?;
        let (report, _sink) = run_posts_suite(stub.base_url(), runner_mode, timeout).await?;
        let failed = failed_scenarios(&report);
        if failed != ["creates-post", "updates-post", "deletes-post"] {
            return Err(format!("{stub_mode} stub with {runner_mode} runner failed {failed:?}").into());
        }
        notes.push(format!("{stub_mode} stub with {runner_mode} runner failed {}", failed.len()));
    }

    reporter.finish("pass", notes)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn events_follow_execution_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("events_follow_execution_order")?;
    let stub = spawn_posts_stub(BackendMode::Simulated).await?;
    let timeout = resolve_timeout(Duration::from_secs(5));
    let (report, sink) = run_posts_suite(stub.base_url(), BackendMode::Simulated, timeout).await?;
    reporter.record_suite(&report, &sink)?;

    let events = sink.events();
    let started = events
        .iter()
        .filter(|event| matches!(event.kind, RunEventKind::ScenarioStarted { .. }))
        .count();
    let steps: Vec<StepStatus> = events
        .iter()
        .filter_map(|event| match &event.kind {
            RunEventKind::StepCompleted {
                result,
                ..
            } => Some(*result),
            _ => None,
        })
        .collect();
    if started != 7 || steps.len() != 10 {
        return Err(format!("unexpected event counts: {started} started, {} steps", steps.len()).into());
    }
    if steps.iter().any(|status| *status != StepStatus::Passed) {
        return Err("a step did not pass".into());
    }
    match events.last().map(|event| &event.kind) {
        Some(RunEventKind::SuiteFinished {
            passed: 7,
            failed: 0,
            ..
        }) => {}
        _ => return Err("suite_finished must be the last event".into()),
    }

    reporter.finish("pass", vec!["event stream matched execution".to_string()])?;
    drop(reporter);
    Ok(())
}
