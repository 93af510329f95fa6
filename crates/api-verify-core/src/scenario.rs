// crates/api-verify-core/src/scenario.rs
// ============================================================================
// Module: Scenario Model
// Description: Static scenario, step, and expectation definitions.
// Purpose: Describe request/assert sequences with explicit output chaining.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Scenario`] is an ordered list of [`Step`]s. Each step names a request
//! (method, [`Target`], optional payload) and what the response must satisfy.
//! Values produced by earlier steps are referenced through [`IdSource`], never
//! through shared mutable state: a step either names an earlier step in the
//! same scenario or an earlier scenario's recorded step.
//!
//! Follow-up checks whose outcome depends on whether the backend persists
//! writes carry a [`StepExpectation::Durability`] pair; the runner applies the
//! half matching the configured [`BackendMode`].
//!
//! Invariants:
//! - Step labels are unique within a scenario; scenario names are unique.
//! - References only point backwards in declaration order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::post::PostId;
use crate::schema::Schema;
use crate::transport::Method;

// ============================================================================
// SECTION: Backend Mode
// ============================================================================

/// Whether the target backend persists writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Writes are durable; follow-up reads observe them.
    Persisting,
    /// Writes are acknowledged but discarded.
    #[default]
    Simulated,
}

impl BackendMode {
    /// Returns the stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Persisting => "persisting",
            Self::Simulated => "simulated",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "persisting" => Ok(Self::Persisting),
            "simulated" => Ok(Self::Simulated),
            other => Err(format!("unknown backend mode `{other}` (expected persisting or simulated)")),
        }
    }
}

// ============================================================================
// SECTION: Targets
// ============================================================================

/// Where an item identifier comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// Fixed identifier.
    Literal(PostId),
    /// Field of an earlier step's response in the same scenario.
    Step {
        /// Label of the producing step.
        step: String,
        /// Response field holding the identifier.
        field: String,
    },
    /// Field of a step recorded by an earlier scenario.
    Scenario {
        /// Name of the producing scenario.
        scenario: String,
        /// Label of the producing step.
        step: String,
        /// Response field holding the identifier.
        field: String,
    },
}

impl IdSource {
    /// Reference to `field` of an earlier step in the same scenario.
    #[must_use]
    pub fn step(step: &str, field: &str) -> Self {
        Self::Step {
            step: step.to_string(),
            field: field.to_string(),
        }
    }

    /// Reference to `field` of a step recorded by another scenario.
    #[must_use]
    pub fn scenario(scenario: &str, step: &str, field: &str) -> Self {
        Self::Scenario {
            scenario: scenario.to_string(),
            step: step.to_string(),
            field: field.to_string(),
        }
    }
}

impl fmt::Display for IdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(id) => write!(f, "{id}"),
            Self::Step {
                step,
                field,
            } => write!(f, "{{{step}.{field}}}"),
            Self::Scenario {
                scenario,
                step,
                field,
            } => write!(f, "{{{scenario}/{step}.{field}}}"),
        }
    }
}

impl From<u64> for IdSource {
    fn from(value: u64) -> Self {
        Self::Literal(PostId::new(value))
    }
}

/// Request target relative to the collection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The collection itself.
    Collection,
    /// A single item.
    Item(IdSource),
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// A check applied to a response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Payload is a JSON object.
    IsObject,
    /// Payload is a non-empty array.
    NonEmptyArray,
    /// Payload decodes into a typed [`Post`](crate::post::Post).
    DecodesAsPost,
    /// Payload object carries every named field.
    HasFields(Vec<String>),
    /// Payload is an array whose elements all carry every named field.
    EveryElementHasFields(Vec<String>),
    /// Payload field equals a literal value.
    FieldEquals {
        /// Field name.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// Payload field equals a resolved identifier.
    FieldEqualsId {
        /// Field name.
        field: String,
        /// Identifier to compare with.
        source: IdSource,
    },
    /// Every listed field equals the payload's field.
    MatchesFields(Map<String, Value>),
    /// At least one listed field differs from the payload's field.
    DiffersFrom(Map<String, Value>),
    /// Payload conforms to the schema.
    MatchesSchema(Schema),
    /// Payload is an array whose elements all conform to the schema.
    EveryElementMatchesSchema(Schema),
}

impl Predicate {
    /// Builds [`Predicate::HasFields`] from field names.
    #[must_use]
    pub fn has_fields(fields: &[&str]) -> Self {
        Self::HasFields(fields.iter().map(ToString::to_string).collect())
    }

    /// Builds [`Predicate::EveryElementHasFields`] from field names.
    #[must_use]
    pub fn every_element_has_fields(fields: &[&str]) -> Self {
        Self::EveryElementHasFields(fields.iter().map(ToString::to_string).collect())
    }

    /// Builds [`Predicate::FieldEquals`].
    #[must_use]
    pub fn field_equals(field: &str, value: Value) -> Self {
        Self::FieldEquals {
            field: field.to_string(),
            value,
        }
    }

    /// Returns a short label used in reports.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::IsObject => "is_object".to_string(),
            Self::NonEmptyArray => "non_empty_array".to_string(),
            Self::DecodesAsPost => "decodes_as_post".to_string(),
            Self::HasFields(fields) => format!("has_fields({})", fields.join(",")),
            Self::EveryElementHasFields(fields) => {
                format!("every_element_has_fields({})", fields.join(","))
            }
            Self::FieldEquals {
                field,
                ..
            } => format!("field_equals({field})"),
            Self::FieldEqualsId {
                field,
                source,
            } => format!("field_equals_id({field}={source})"),
            Self::MatchesFields(fields) => format!("matches_fields({})", joined_keys(fields)),
            Self::DiffersFrom(fields) => format!("differs_from({})", joined_keys(fields)),
            Self::MatchesSchema(_) => "matches_schema".to_string(),
            Self::EveryElementMatchesSchema(_) => "every_element_matches_schema".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// Expected status plus payload predicates for one response.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    /// Expected HTTP status code.
    pub status: u16,
    /// Payload predicates, evaluated in order.
    pub predicates: Vec<Predicate>,
}

impl Expectation {
    /// Expects `status` with no payload predicates.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            predicates: Vec::new(),
        }
    }

    /// Adds a payload predicate.
    #[must_use]
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Returns true when the expected status is outside 2xx.
    #[must_use]
    pub const fn expects_failure_status(&self) -> bool {
        !(self.status >= 200 && self.status < 300)
    }
}

/// Expectation attached to a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepExpectation {
    /// Same expectation regardless of backend.
    Fixed(Expectation),
    /// Outcome depends on whether the backend persists writes.
    Durability {
        /// Applied against a persisting backend.
        persisting: Expectation,
        /// Applied against a simulated backend.
        simulated: Expectation,
    },
}

impl StepExpectation {
    /// Selects the expectation for `mode`. The mode is returned when the
    /// choice was environment-dependent.
    #[must_use]
    pub const fn select(&self, mode: BackendMode) -> (&Expectation, Option<BackendMode>) {
        match self {
            Self::Fixed(expectation) => (expectation, None),
            Self::Durability {
                persisting,
                simulated,
            } => match mode {
                BackendMode::Persisting => (persisting, Some(mode)),
                BackendMode::Simulated => (simulated, Some(mode)),
            },
        }
    }
}

// ============================================================================
// SECTION: Steps & Scenarios
// ============================================================================

/// One request plus its expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Label, unique within the scenario.
    pub label: String,
    /// HTTP method.
    pub method: Method,
    /// Request target.
    pub target: Target,
    /// Optional JSON payload.
    pub payload: Option<Value>,
    /// Expected outcome.
    pub expect: StepExpectation,
}

impl Step {
    /// Creates a step expecting a bare 200.
    #[must_use]
    pub fn new(label: &str, method: Method, target: Target) -> Self {
        Self {
            label: label.to_string(),
            method,
            target,
            payload: None,
            expect: StepExpectation::Fixed(Expectation::status(200)),
        }
    }

    /// GET of the collection.
    #[must_use]
    pub fn list(label: &str) -> Self {
        Self::new(label, Method::Get, Target::Collection)
    }

    /// GET of a single item.
    #[must_use]
    pub fn fetch(label: &str, id: impl Into<IdSource>) -> Self {
        Self::new(label, Method::Get, Target::Item(id.into()))
    }

    /// POST to the collection.
    #[must_use]
    pub fn create(label: &str, payload: Value) -> Self {
        Self::new(label, Method::Post, Target::Collection).with_payload(payload)
    }

    /// PUT of a single item.
    #[must_use]
    pub fn update(label: &str, id: impl Into<IdSource>, payload: Value) -> Self {
        Self::new(label, Method::Put, Target::Item(id.into())).with_payload(payload)
    }

    /// DELETE of a single item.
    #[must_use]
    pub fn delete(label: &str, id: impl Into<IdSource>) -> Self {
        Self::new(label, Method::Delete, Target::Item(id.into()))
    }

    /// Attaches a JSON payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets a backend-independent expectation.
    #[must_use]
    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expect = StepExpectation::Fixed(expectation);
        self
    }

    /// Sets a durability-dependent expectation pair.
    #[must_use]
    pub fn expect_durable(mut self, persisting: Expectation, simulated: Expectation) -> Self {
        self.expect = StepExpectation::Durability {
            persisting,
            simulated,
        };
        self
    }

    /// Returns every identifier source the step reads.
    fn sources(&self) -> Vec<&IdSource> {
        let mut sources = Vec::new();
        if let Target::Item(source) = &self.target {
            sources.push(source);
        }
        let expectations = match &self.expect {
            StepExpectation::Fixed(expectation) => vec![expectation],
            StepExpectation::Durability {
                persisting,
                simulated,
            } => vec![persisting, simulated],
        };
        for expectation in expectations {
            for predicate in &expectation.predicates {
                if let Predicate::FieldEqualsId {
                    source,
                    ..
                } = predicate
                {
                    sources.push(source);
                }
            }
        }
        sources
    }
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Unique scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Creates an empty scenario.
    #[must_use]
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Returns the names of scenarios this scenario reads outputs from.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.steps
            .iter()
            .flat_map(Step::sources)
            .filter_map(|source| match source {
                IdSource::Scenario {
                    scenario,
                    ..
                } => Some(scenario.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Errors in scenario definitions or output resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    /// Two scenarios share a name.
    #[error("duplicate scenario name `{0}`")]
    DuplicateScenario(String),
    /// Two steps in one scenario share a label.
    #[error("scenario `{scenario}` has duplicate step `{step}`")]
    DuplicateStep {
        /// Scenario name.
        scenario: String,
        /// Step label.
        step: String,
    },
    /// A reference does not point to an earlier step or scenario.
    #[error("scenario `{scenario}` references unknown or later output `{reference}`")]
    ForwardReference {
        /// Referencing scenario.
        scenario: String,
        /// Rendered reference.
        reference: String,
    },
    /// A referenced output was never recorded.
    #[error("output `{reference}` is unavailable")]
    MissingOutput {
        /// Rendered reference.
        reference: String,
    },
    /// The referenced field is absent or not an identifier.
    #[error("output `{reference}` does not hold an identifier: {actual}")]
    InvalidIdentifier {
        /// Rendered reference.
        reference: String,
        /// The value found.
        actual: String,
    },
}

/// Checks names are unique and references only point backwards.
///
/// # Errors
///
/// Returns the first [`ScenarioError`] found in declaration order.
pub fn validate_scenarios(scenarios: &[Scenario]) -> Result<(), ScenarioError> {
    let mut seen_scenarios: BTreeSet<&str> = BTreeSet::new();
    for scenario in scenarios {
        let mut seen_steps: BTreeSet<&str> = BTreeSet::new();
        for step in &scenario.steps {
            for source in step.sources() {
                let known = match source {
                    IdSource::Literal(_) => true,
                    IdSource::Step {
                        step,
                        ..
                    } => seen_steps.contains(step.as_str()),
                    IdSource::Scenario {
                        scenario: producer,
                        step: producer_step,
                        ..
                    } => {
                        seen_scenarios.contains(producer.as_str())
                            && scenario_has_step(scenarios, producer, producer_step)
                    }
                };
                if !known {
                    return Err(ScenarioError::ForwardReference {
                        scenario: scenario.name.clone(),
                        reference: source.to_string(),
                    });
                }
            }
            if !seen_steps.insert(step.label.as_str()) {
                return Err(ScenarioError::DuplicateStep {
                    scenario: scenario.name.clone(),
                    step: step.label.clone(),
                });
            }
        }
        if !seen_scenarios.insert(scenario.name.as_str()) {
            return Err(ScenarioError::DuplicateScenario(scenario.name.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the named scenario declares the named step.
fn scenario_has_step(scenarios: &[Scenario], scenario: &str, step: &str) -> bool {
    scenarios
        .iter()
        .find(|candidate| candidate.name == scenario)
        .is_some_and(|candidate| candidate.steps.iter().any(|entry| entry.label == step))
}

/// Joins object keys for labels.
fn joined_keys(fields: &Map<String, Value>) -> String {
    fields.keys().map(String::as_str).collect::<Vec<_>>().join(",")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
