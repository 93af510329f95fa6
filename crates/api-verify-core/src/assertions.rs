// crates/api-verify-core/src/assertions.rs
// ============================================================================
// Module: Response Assertions
// Description: Evaluation of status and payload predicates.
// Purpose: Turn a response into expected-vs-actual diagnostics.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each check returns `None` on success or a [`Mismatch`] describing the
//! expected and actual values. Checks never panic and never short-circuit the
//! caller; the runner decides how mismatches affect the verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::post::Post;
use crate::post::PostId;
use crate::scenario::IdSource;
use crate::scenario::Predicate;
use crate::scenario::ScenarioError;
use crate::schema::PrimitiveType;
use crate::schema::Schema;
use crate::schema::validate_schema;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A failed check with its diverging values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Check label.
    pub check: String,
    /// Rendered expected value.
    pub expected: String,
    /// Rendered actual value.
    pub actual: String,
}

impl Mismatch {
    /// Builds a mismatch from displayable parts.
    fn new(check: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Compares the response status with the expected one.
#[must_use]
pub fn check_status(expected: u16, actual: u16) -> Option<Mismatch> {
    (expected != actual).then(|| Mismatch::new("status", expected.to_string(), actual.to_string()))
}

/// Evaluates one payload predicate. `resolve` maps identifier sources to
/// concrete identifiers for [`Predicate::FieldEqualsId`].
pub fn check_predicate<F>(predicate: &Predicate, body: Option<&Value>, resolve: F) -> Option<Mismatch>
where
    F: Fn(&IdSource) -> Result<PostId, ScenarioError>,
{
    let label = predicate.label();
    match predicate {
        Predicate::IsObject => match body {
            Some(Value::Object(_)) => None,
            other => Some(Mismatch::new(label, "object", describe(other))),
        },
        Predicate::NonEmptyArray => match body {
            Some(Value::Array(items)) if !items.is_empty() => None,
            Some(Value::Array(_)) => Some(Mismatch::new(label, "non-empty array", "empty array")),
            other => Some(Mismatch::new(label, "non-empty array", describe(other))),
        },
        Predicate::DecodesAsPost => match body {
            Some(value) => Post::deserialize(value)
                .err()
                .map(|err| Mismatch::new(label, "post", err.to_string())),
            None => Some(Mismatch::new(label, "post", "<absent>")),
        },
        Predicate::HasFields(fields) => match body {
            Some(Value::Object(object)) => {
                let missing = missing_fields(object, fields);
                (!missing.is_empty()).then(|| {
                    Mismatch::new(label, fields.join(","), format!("missing {}", missing.join(",")))
                })
            }
            other => Some(Mismatch::new(label, "object", describe(other))),
        },
        Predicate::EveryElementHasFields(fields) => {
            each_element(&label, body, |element| match element {
                Value::Object(object) => {
                    let missing = missing_fields(object, fields);
                    (!missing.is_empty()).then(|| format!("missing {}", missing.join(",")))
                }
                other => Some(format!("{} instead of object", PrimitiveType::describe(other))),
            })
        }
        Predicate::FieldEquals {
            field,
            value,
        } => {
            let actual = field_of(body, field);
            (actual != Some(value)).then(|| Mismatch::new(label, value.to_string(), render(actual)))
        }
        Predicate::FieldEqualsId {
            field,
            source,
        } => match resolve(source) {
            Ok(id) => {
                let actual = field_of(body, field);
                let matches = actual.and_then(Value::as_u64) == Some(id.get());
                (!matches).then(|| Mismatch::new(label, id.to_string(), render(actual)))
            }
            Err(err) => Some(Mismatch::new(label, source.to_string(), err.to_string())),
        },
        Predicate::MatchesFields(expected) => {
            let diffs = field_diffs(body, expected);
            (!diffs.is_empty()).then(|| {
                Mismatch::new(label, Value::Object(expected.clone()).to_string(), diffs.join("; "))
            })
        }
        Predicate::DiffersFrom(expected) => {
            let diffs = field_diffs(body, expected);
            diffs.is_empty().then(|| {
                Mismatch::new(
                    label,
                    format!("at least one field to differ from {}", Value::Object(expected.clone())),
                    "all fields equal",
                )
            })
        }
        Predicate::MatchesSchema(schema) => schema_mismatch(&label, body, schema),
        Predicate::EveryElementMatchesSchema(schema) => each_element(&label, body, |element| {
            let report = validate_schema(element, schema);
            (!report.is_valid()).then(|| report.summary())
        }),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks a single payload against a schema.
fn schema_mismatch(label: &str, body: Option<&Value>, schema: &Schema) -> Option<Mismatch> {
    let Some(body) = body else {
        return Some(Mismatch::new(label, "schema-conforming object", "<absent>"));
    };
    let report = validate_schema(body, schema);
    (!report.is_valid())
        .then(|| Mismatch::new(label, "schema-conforming object", report.summary()))
}

/// Applies `check` to every array element and reports failing indices.
fn each_element<F>(label: &str, body: Option<&Value>, check: F) -> Option<Mismatch>
where
    F: Fn(&Value) -> Option<String>,
{
    let Some(Value::Array(items)) = body else {
        return Some(Mismatch::new(label, "array", describe(body)));
    };
    let failures: Vec<String> = items
        .iter()
        .enumerate()
        .filter_map(|(index, element)| check(element).map(|reason| format!("[{index}] {reason}")))
        .collect();
    (!failures.is_empty())
        .then(|| Mismatch::new(label, "every element conforming", failures.join("; ")))
}

/// Returns the named fields absent from `object`.
fn missing_fields(object: &Map<String, Value>, fields: &[String]) -> Vec<String> {
    fields.iter().filter(|field| !object.contains_key(field.as_str())).cloned().collect()
}

/// Lists fields whose payload value differs from the expected one.
fn field_diffs(body: Option<&Value>, expected: &Map<String, Value>) -> Vec<String> {
    expected
        .iter()
        .filter_map(|(field, value)| {
            let actual = field_of(body, field);
            (actual != Some(value)).then(|| format!("{field}: {}", render(actual)))
        })
        .collect()
}

/// Reads a top-level field from an object payload.
fn field_of<'a>(body: Option<&'a Value>, field: &str) -> Option<&'a Value> {
    body.and_then(Value::as_object).and_then(|object| object.get(field))
}

/// Renders a value or `<absent>`.
fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "<absent>".to_string(), ToString::to_string)
}

/// Describes the type of a payload or `<absent>`.
fn describe(value: Option<&Value>) -> String {
    value.map_or_else(|| "<absent>".to_string(), |value| PrimitiveType::describe(value).to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
