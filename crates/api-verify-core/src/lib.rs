// crates/api-verify-core/src/lib.rs
// ============================================================================
// Module: API Verify Core
// Description: Scenario model, transport, assertions, and runner for REST checks.
// Purpose: Verify a remote posts resource against its CRUD contract.
// Dependencies: async-trait, jsonschema, reqwest, serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! This crate drives black-box verification of a JSON REST collection. A
//! [`Transport`] issues requests, [`PostsClient`] maps CRUD operations onto
//! paths, and [`SuiteRunner`] executes declarative [`Scenario`]s in order,
//! producing a [`SuiteReport`] with one verdict per scenario.
//! Invariants:
//! - Scenarios run sequentially, one request in flight at a time.
//! - A failing scenario never aborts the suite.
//! - Step outputs are shared only through explicit [`IdSource`] references.
//!
//! Responses are untrusted: bodies are size-bounded and every check reports
//! expected and actual values instead of panicking.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assertions;
pub mod client;
pub mod events;
pub mod post;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod schema;
pub mod suite;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertions::Mismatch;
pub use client::PostsClient;
pub use client::capture_status;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::RunEvent;
pub use events::RunEventKind;
pub use events::RunEventSink;
pub use events::StderrEventSink;
pub use post::NewPost;
pub use post::POST_FIELDS;
pub use post::Post;
pub use post::PostId;
pub use post::PostPatch;
pub use report::AssertionFailure;
pub use report::ReportError;
pub use report::ReportFormat;
pub use report::ScenarioVerdict;
pub use report::StepOutcome;
pub use report::StepStatus;
pub use report::SuiteReport;
pub use report::Verdict;
pub use report::duration_millis;
pub use runner::Outputs;
pub use runner::SuiteRunner;
pub use scenario::BackendMode;
pub use scenario::Expectation;
pub use scenario::IdSource;
pub use scenario::Predicate;
pub use scenario::Scenario;
pub use scenario::ScenarioError;
pub use scenario::Step;
pub use scenario::StepExpectation;
pub use scenario::Target;
pub use scenario::validate_scenarios;
pub use schema::JsonSchemaValidator;
pub use schema::PrimitiveType;
pub use schema::Schema;
pub use schema::SchemaError;
pub use schema::SchemaReport;
pub use schema::SchemaViolation;
pub use schema::validate_schema;
pub use suite::posts_suite;
pub use transport::ApiRequest;
pub use transport::ApiResponse;
pub use transport::HttpTransport;
pub use transport::MAX_RESPONSE_BYTES;
pub use transport::Method;
pub use transport::Transport;
pub use transport::TransportError;
