// crates/api-verify-core/src/runner.rs
// ============================================================================
// Module: Suite Runner
// Description: Sequential execution of scenarios against a transport.
// Purpose: Produce exactly one verdict per scenario with scenario-local failures.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`SuiteRunner`] executes scenarios strictly in declaration order, one
//! request at a time. Each step's request is sent and awaited, then its
//! expectation is evaluated. Failure handling:
//! - A non-2xx status equal to the expected one is captured and asserted on.
//! - Any other non-2xx status, or a network/timeout/decode failure, aborts the
//!   scenario at that step; the scenario fails and the next one starts.
//! - Assertion failures record every mismatch of the step, then stop the
//!   scenario; remaining steps are reported as skipped.
//!
//! Steps are dispatched through the [`PostsClient`] operation matching their
//! method and target; shapes without a matching operation go out verbatim.
//!
//! Outputs of passing steps are recorded in [`Outputs`] under
//! `(scenario, step)`. Later steps read them only through explicit
//! [`IdSource`] references.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::assertions::Mismatch;
use crate::assertions::check_predicate;
use crate::assertions::check_status;
use crate::client::PostsClient;
use crate::client::capture_status;
use crate::events::NoopEventSink;
use crate::events::RunEvent;
use crate::events::RunEventKind;
use crate::events::RunEventSink;
use crate::post::PostId;
use crate::report::AssertionFailure;
use crate::report::ScenarioVerdict;
use crate::report::StepOutcome;
use crate::report::StepStatus;
use crate::report::SuiteReport;
use crate::report::Verdict;
use crate::report::duration_millis;
use crate::scenario::BackendMode;
use crate::scenario::IdSource;
use crate::scenario::Scenario;
use crate::scenario::ScenarioError;
use crate::scenario::Step;
use crate::scenario::Target;
use crate::scenario::validate_scenarios;
use crate::transport::ApiRequest;
use crate::transport::ApiResponse;
use crate::transport::Method;
use crate::transport::Transport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Response bodies of passing steps, keyed by `(scenario, step)`.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    /// Recorded bodies.
    entries: BTreeMap<(String, String), Value>,
}

impl Outputs {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the body produced by a step.
    pub fn record(&mut self, scenario: &str, step: &str, body: Value) {
        self.entries.insert((scenario.to_string(), step.to_string()), body);
    }

    /// Returns a recorded body.
    #[must_use]
    pub fn get(&self, scenario: &str, step: &str) -> Option<&Value> {
        self.entries.get(&(scenario.to_string(), step.to_string()))
    }

    /// Resolves an identifier source on behalf of `current` scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::MissingOutput`] when the producing step never
    /// passed and [`ScenarioError::InvalidIdentifier`] when the field is not an
    /// unsigned integer.
    pub fn resolve(&self, current: &str, source: &IdSource) -> Result<PostId, ScenarioError> {
        let (scenario, step, field) = match source {
            IdSource::Literal(id) => return Ok(*id),
            IdSource::Step {
                step,
                field,
            } => (current, step.as_str(), field.as_str()),
            IdSource::Scenario {
                scenario,
                step,
                field,
            } => (scenario.as_str(), step.as_str(), field.as_str()),
        };
        let body = self.get(scenario, step).ok_or_else(|| ScenarioError::MissingOutput {
            reference: source.to_string(),
        })?;
        let value = body.get(field);
        value.and_then(Value::as_u64).map(PostId::new).ok_or_else(|| {
            ScenarioError::InvalidIdentifier {
                reference: source.to_string(),
                actual: value.map_or_else(|| "<absent>".to_string(), ToString::to_string),
            }
        })
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Sequential scenario runner.
pub struct SuiteRunner<T> {
    /// Client used for every request.
    client: PostsClient<T>,
    /// Backend mode used to pick durability expectations.
    backend: BackendMode,
    /// Event destination.
    sink: Arc<dyn RunEventSink>,
}

impl<T: Transport> SuiteRunner<T> {
    /// Creates a runner that discards events.
    #[must_use]
    pub fn new(client: PostsClient<T>, backend: BackendMode) -> Self {
        Self {
            client,
            backend,
            sink: Arc::new(NoopEventSink),
        }
    }

    /// Routes events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RunEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the client.
    pub const fn client(&self) -> &PostsClient<T> {
        &self.client
    }

    /// Runs every scenario in order.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the scenario list is malformed; no
    /// request is issued in that case. Scenario failures are reported in the
    /// returned [`SuiteReport`], never as errors.
    pub async fn run(&self, scenarios: &[Scenario]) -> Result<SuiteReport, ScenarioError> {
        validate_scenarios(scenarios)?;
        let started = Instant::now();
        let mut outputs = Outputs::new();
        let mut verdicts = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            verdicts.push(self.run_scenario(scenario, &mut outputs).await);
        }
        let report = SuiteReport::new(
            self.client.collection_path(),
            self.backend,
            verdicts,
            duration_millis(started.elapsed()),
        );
        self.emit(RunEventKind::SuiteFinished {
            backend: report.backend,
            total: report.total,
            passed: report.passed,
            failed: report.failed,
            duration_ms: report.duration_ms,
        });
        Ok(report)
    }

    /// Runs one scenario, recording passing step outputs into `outputs`.
    pub async fn run_scenario(&self, scenario: &Scenario, outputs: &mut Outputs) -> ScenarioVerdict {
        let started = Instant::now();
        self.emit(RunEventKind::ScenarioStarted {
            scenario: scenario.name.clone(),
            steps: scenario.steps.len(),
        });
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut failures = Vec::new();
        let mut halted = false;
        for step in &scenario.steps {
            if halted {
                steps.push(skipped(step, self.backend));
                continue;
            }
            let (outcome, step_failures, body) = self.run_step(scenario, step, outputs).await;
            if outcome.result == StepStatus::Passed {
                if let Some(body) = body {
                    outputs.record(&scenario.name, &step.label, body);
                }
            } else {
                halted = true;
            }
            failures.extend(step_failures);
            steps.push(outcome);
        }
        let verdict = if failures.is_empty() { Verdict::Pass } else { Verdict::Fail };
        let duration_ms = duration_millis(started.elapsed());
        self.emit(RunEventKind::ScenarioFinished {
            scenario: scenario.name.clone(),
            verdict,
            failures: failures.len(),
            duration_ms,
        });
        ScenarioVerdict {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            verdict,
            steps,
            failures,
            duration_ms,
        }
    }

    /// Executes one step and evaluates its expectation.
    async fn run_step(
        &self,
        scenario: &Scenario,
        step: &Step,
        outputs: &Outputs,
    ) -> (StepOutcome, Vec<AssertionFailure>, Option<Value>) {
        let started = Instant::now();
        let (expectation, applied_backend) = step.expect.select(self.backend);
        let mut outcome = StepOutcome {
            label: step.label.clone(),
            method: step.method,
            path: None,
            expected_status: expectation.status,
            status: None,
            applied_backend,
            result: StepStatus::Aborted,
            duration_ms: 0,
        };

        let id = match resolve_target(&scenario.name, &step.target, outputs) {
            Ok(id) => id,
            Err(err) => {
                let failure = AssertionFailure {
                    step: step.label.clone(),
                    check: "dependency".to_string(),
                    expected: "resolvable identifier".to_string(),
                    actual: err.to_string(),
                };
                outcome.duration_ms = duration_millis(started.elapsed());
                self.emit_step(&scenario.name, &outcome, None);
                return (outcome, vec![failure], None);
            }
        };
        let path = id.map_or_else(
            || self.client.collection_path().to_string(),
            |id| self.client.item_path(id),
        );
        outcome.path = Some(path.clone());

        let result = self.dispatch(step, id, path).await;
        let response = match capture_status(result, expectation.status) {
            Ok(response) => response,
            Err(err) => {
                outcome.status = err.status();
                outcome.duration_ms = duration_millis(started.elapsed());
                let failure = transport_failure(&step.label, expectation.status, &err);
                self.emit_step(&scenario.name, &outcome, None);
                return (outcome, vec![failure], None);
            }
        };
        outcome.status = Some(response.status);

        let mut mismatches: Vec<Mismatch> =
            check_status(expectation.status, response.status).into_iter().collect();
        let resolve = |source: &IdSource| outputs.resolve(&scenario.name, source);
        for predicate in &expectation.predicates {
            if let Some(mismatch) = check_predicate(predicate, response.body.as_ref(), resolve) {
                mismatches.push(mismatch);
            }
        }
        outcome.result =
            if mismatches.is_empty() { StepStatus::Passed } else { StepStatus::Failed };
        outcome.duration_ms = duration_millis(started.elapsed());
        self.emit_step(&scenario.name, &outcome, Some(response.body_bytes));
        let failures = mismatches
            .into_iter()
            .map(|mismatch| AssertionFailure::from_mismatch(&step.label, mismatch))
            .collect();
        (outcome, failures, response.body)
    }

    /// Issues a step through the client operation matching its shape.
    async fn dispatch(
        &self,
        step: &Step,
        id: Option<PostId>,
        path: String,
    ) -> Result<ApiResponse, TransportError> {
        match (step.method, id, step.payload.as_ref()) {
            (Method::Get, None, None) => self.client.fetch_collection().await,
            (Method::Get, Some(id), None) => self.client.fetch_item(id).await,
            (Method::Post, None, Some(payload)) => self.client.create_item(payload).await,
            (Method::Put, Some(id), Some(payload)) => self.client.update_item(id, payload).await,
            (Method::Delete, Some(id), None) => self.client.delete_item(id).await,
            (method, _, payload) => {
                let request = ApiRequest {
                    method,
                    path,
                    body: payload.cloned(),
                };
                self.client.send(&request).await
            }
        }
    }

    /// Emits a step completion event.
    fn emit_step(&self, scenario: &str, outcome: &StepOutcome, response_bytes: Option<usize>) {
        self.emit(RunEventKind::StepCompleted {
            scenario: scenario.to_string(),
            step: outcome.label.clone(),
            method: outcome.method,
            path: outcome.path.clone(),
            status: outcome.status,
            result: outcome.result,
            response_bytes,
            duration_ms: outcome.duration_ms,
        });
    }

    /// Sends an event to the sink.
    fn emit(&self, kind: RunEventKind) {
        self.sink.record(&RunEvent::now(kind));
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves a step target; `None` addresses the collection.
fn resolve_target(
    scenario: &str,
    target: &Target,
    outputs: &Outputs,
) -> Result<Option<PostId>, ScenarioError> {
    match target {
        Target::Collection => Ok(None),
        Target::Item(source) => outputs.resolve(scenario, source).map(Some),
    }
}

/// Builds the outcome for a step that was never attempted.
fn skipped(step: &Step, backend: BackendMode) -> StepOutcome {
    let (expectation, applied_backend) = step.expect.select(backend);
    StepOutcome {
        label: step.label.clone(),
        method: step.method,
        path: None,
        expected_status: expectation.status,
        status: None,
        applied_backend,
        result: StepStatus::Skipped,
        duration_ms: 0,
    }
}

/// Describes an unexpected transport failure.
fn transport_failure(step: &str, expected_status: u16, err: &TransportError) -> AssertionFailure {
    let actual = match err {
        TransportError::Status {
            body: Some(body),
            ..
        } => format!("{err}: {body}"),
        _ => err.to_string(),
    };
    AssertionFailure {
        step: step.to_string(),
        check: "transport".to_string(),
        expected: format!("http status {expected_status}"),
        actual,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
