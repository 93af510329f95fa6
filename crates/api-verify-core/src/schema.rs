// crates/api-verify-core/src/schema.rs
// ============================================================================
// Module: Payload Schemas
// Description: Structural contracts for JSON payloads returned by the API.
// Purpose: Validate required fields and primitive types with field diagnostics.
// Dependencies: jsonschema, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Schema`] maps field names to primitive types plus a required set.
//! [`validate_schema`] walks a payload and accumulates every violation, naming
//! the offending field. [`JsonSchemaValidator`] evaluates the equivalent
//! JSON-Schema document (Draft 2020-12) for callers that hold raw documents.
//! Both paths follow JSON-Schema type semantics: `number` accepts integers and
//! integral floats count as `integer`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use jsonschema::Draft;
use jsonschema::Validator;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::post::POST_FIELDS;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Primitive JSON types a schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// JSON string.
    String,
    /// Any JSON number, integral or not.
    Number,
    /// JSON number without a fractional part.
    Integer,
    /// JSON boolean.
    Boolean,
    /// JSON object.
    Object,
    /// JSON array.
    Array,
    /// JSON null.
    Null,
}

impl PrimitiveType {
    /// Returns the JSON-Schema type keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
        }
    }

    /// Returns true when `value` satisfies this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => is_integral(value),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Null => value.is_null(),
        }
    }

    /// Returns the most specific type label describing `value`.
    #[must_use]
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) if is_integral(value) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural contract for a JSON object payload.
///
/// # Invariants
/// - Every required field is also a declared property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    /// Declared field types keyed by field name.
    properties: BTreeMap<String, PrimitiveType>,
    /// Field names that must be present.
    required: BTreeSet<String>,
}

impl Schema {
    /// Creates an empty schema that accepts any object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an optional field with the given type.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: PrimitiveType) -> Self {
        self.properties.insert(name.into(), kind);
        self
    }

    /// Declares a required field with the given type.
    #[must_use]
    pub fn required_field(mut self, name: impl Into<String>, kind: PrimitiveType) -> Self {
        let name = name.into();
        self.required.insert(name.clone());
        self.properties.insert(name, kind);
        self
    }

    /// Returns the contract for a post object: every field required.
    #[must_use]
    pub fn post() -> Self {
        let [user_id, id, title, body] = POST_FIELDS;
        Self::new()
            .required_field(user_id, PrimitiveType::Number)
            .required_field(id, PrimitiveType::Number)
            .required_field(title, PrimitiveType::String)
            .required_field(body, PrimitiveType::String)
    }

    /// Returns the declared field types.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, PrimitiveType> {
        &self.properties
    }

    /// Returns the required field names.
    #[must_use]
    pub const fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Renders the equivalent JSON-Schema document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, kind)| (name.clone(), serde_json::json!({ "type": kind.as_str() })))
            .collect();
        let required: Vec<Value> =
            self.required.iter().map(|name| Value::String(name.clone())).collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaViolation {
    /// The payload itself is not an object.
    NotAnObject {
        /// Type label of the payload.
        actual: &'static str,
    },
    /// A required field is absent.
    MissingField {
        /// Missing field name.
        field: String,
    },
    /// A declared field has the wrong primitive type.
    WrongType {
        /// Offending field name.
        field: String,
        /// Declared type.
        expected: PrimitiveType,
        /// Type label of the actual value.
        actual: &'static str,
    },
}

impl SchemaViolation {
    /// Returns the field the violation refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAnObject {
                ..
            } => None,
            Self::MissingField {
                field,
            }
            | Self::WrongType {
                field,
                ..
            } => Some(field),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject {
                actual,
            } => write!(f, "payload is {actual}, expected object"),
            Self::MissingField {
                field,
            } => write!(f, "missing required field `{field}`"),
            Self::WrongType {
                field,
                expected,
                actual,
            } => write!(f, "field `{field}` is {actual}, expected {expected}"),
        }
    }
}

/// Accumulated result of a structural schema check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// Violations in field order.
    violations: Vec<SchemaViolation>,
}

impl SchemaReport {
    /// Returns true when the payload conforms.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the recorded violations.
    #[must_use]
    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }

    /// Joins violations into a single diagnostic line.
    #[must_use]
    pub fn summary(&self) -> String {
        self.violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    }
}

/// Errors raised while compiling schema documents.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document is not a valid JSON-Schema.
    #[error("invalid schema document: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Structural Validation
// ============================================================================

/// Checks `payload` against `schema`, accumulating every violation.
#[must_use]
pub fn validate_schema(payload: &Value, schema: &Schema) -> SchemaReport {
    let Some(object) = payload.as_object() else {
        return SchemaReport {
            violations: vec![SchemaViolation::NotAnObject {
                actual: PrimitiveType::describe(payload),
            }],
        };
    };
    let mut violations = Vec::new();
    for field in &schema.required {
        if !object.contains_key(field) {
            violations.push(SchemaViolation::MissingField {
                field: field.clone(),
            });
        }
    }
    for (field, expected) in &schema.properties {
        let Some(value) = object.get(field) else {
            continue;
        };
        if !expected.matches(value) {
            violations.push(SchemaViolation::WrongType {
                field: field.clone(),
                expected: *expected,
                actual: PrimitiveType::describe(value),
            });
        }
    }
    SchemaReport {
        violations,
    }
}

// ============================================================================
// SECTION: JSON-Schema Validation
// ============================================================================

/// Compiled JSON-Schema document.
pub struct JsonSchemaValidator {
    /// Compiled validator.
    validator: Validator,
}

impl JsonSchemaValidator {
    /// Compiles a raw JSON-Schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] when the document does not compile.
    pub fn compile(document: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(document)
            .map_err(|err| SchemaError::Invalid(err.to_string()))?;
        Ok(Self {
            validator,
        })
    }

    /// Compiles the document equivalent of a typed [`Schema`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] when the document does not compile.
    pub fn for_schema(schema: &Schema) -> Result<Self, SchemaError> {
        Self::compile(&schema.to_document())
    }

    /// Returns true when `payload` conforms to the document.
    #[must_use]
    pub fn conforms(&self, payload: &Value) -> bool {
        self.validator.is_valid(payload)
    }

    /// Returns validator messages for every violation.
    #[must_use]
    pub fn messages(&self, payload: &Value) -> Vec<String> {
        self.validator.iter_errors(payload).map(|err| err.to_string()).collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true for numbers without a fractional part.
#[allow(clippy::float_cmp, reason = "Exact zero fraction is the integer definition.")]
fn is_integral(value: &Value) -> bool {
    if value.is_u64() || value.is_i64() {
        return true;
    }
    value.as_f64().is_some_and(|number| number.is_finite() && number.fract() == 0.0)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
