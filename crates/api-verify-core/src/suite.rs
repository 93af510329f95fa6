// crates/api-verify-core/src/suite.rs
// ============================================================================
// Module: Posts Suite
// Description: Built-in verification scenarios for the posts resource.
// Purpose: Declare the CRUD contract checks run by the CLI and system tests.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`posts_suite`] declares seven scenarios covering schema conformance,
//! listing, single reads, a missing item, and create/update/delete with
//! follow-up reads. Follow-up reads after a write carry durability pairs so
//! the same suite passes against persisting and simulated backends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::post::NewPost;
use crate::post::POST_FIELDS;
use crate::post::PostPatch;
use crate::scenario::Expectation;
use crate::scenario::IdSource;
use crate::scenario::Predicate;
use crate::scenario::Scenario;
use crate::scenario::Step;
use crate::schema::Schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identifier of the item read, updated, and deleted by the suite.
pub const EXISTING_POST_ID: u64 = 1;

/// Identifier expected to be absent on the target.
pub const MISSING_POST_ID: u64 = 9999;

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Returns the built-in scenarios in execution order.
#[must_use]
pub fn posts_suite() -> Vec<Scenario> {
    vec![
        validates_post_schema(),
        lists_posts(),
        fetches_post_by_id(),
        missing_post_returns_404(),
        creates_post(),
        updates_post(),
        deletes_post(),
    ]
}

/// Payload sent by `creates-post`.
#[must_use]
pub fn create_payload() -> NewPost {
    NewPost {
        user_id: 100,
        title: "New Post Title".to_string(),
        body: "This is the body of the new post.".to_string(),
    }
}

/// Payload sent by `updates-post`.
#[must_use]
pub fn update_payload() -> PostPatch {
    PostPatch {
        user_id: None,
        title: Some("Updated Post Title".to_string()),
        body: Some("This is the updated body of the post.".to_string()),
    }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// A single post conforms to the post schema.
fn validates_post_schema() -> Scenario {
    Scenario::new("validates-post-schema", "a single post conforms to the post schema").step(
        Step::fetch("fetch", EXISTING_POST_ID)
            .expect(Expectation::status(200).with(Predicate::MatchesSchema(Schema::post()))),
    )
}

/// The collection is a non-empty array of complete posts.
fn lists_posts() -> Scenario {
    Scenario::new("lists-posts", "the collection lists posts with every field").step(
        Step::list("list").expect(
            Expectation::status(200)
                .with(Predicate::NonEmptyArray)
                .with(Predicate::every_element_has_fields(&POST_FIELDS)),
        ),
    )
}

/// A known post is returned with its identifier.
fn fetches_post_by_id() -> Scenario {
    Scenario::new("fetches-post-by-id", "a known post is returned by id").step(
        Step::fetch("fetch", EXISTING_POST_ID).expect(
            Expectation::status(200)
                .with(Predicate::IsObject)
                .with(Predicate::has_fields(&POST_FIELDS))
                .with(Predicate::DecodesAsPost)
                .with(Predicate::field_equals("id", json!(EXISTING_POST_ID))),
        ),
    )
}

/// An unknown identifier yields 404.
fn missing_post_returns_404() -> Scenario {
    Scenario::new("missing-post-returns-404", "an unknown post id yields 404")
        .step(Step::fetch("fetch", MISSING_POST_ID).expect(Expectation::status(404)))
}

/// Creating echoes the payload and the result is readable when persisted.
fn creates_post() -> Scenario {
    let fields = payload_fields(&create_payload());
    Scenario::new("creates-post", "a created post echoes its fields and can be read back")
        .step(
            Step::create("create", Value::Object(fields.clone())).expect(
                Expectation::status(201)
                    .with(Predicate::MatchesFields(fields.clone()))
                    .with(Predicate::has_fields(&["id"])),
            ),
        )
        .step(Step::fetch("verify", IdSource::step("create", "id")).expect_durable(
            Expectation::status(200).with(Predicate::MatchesFields(fields)),
            Expectation::status(404),
        ))
}

/// Updating echoes the payload and the change is readable when persisted.
fn updates_post() -> Scenario {
    let fields = payload_fields(&update_payload());
    Scenario::new("updates-post", "an updated post echoes its fields and can be read back")
        .step(
            Step::update("update", EXISTING_POST_ID, Value::Object(fields.clone()))
                .expect(Expectation::status(200).with(Predicate::MatchesFields(fields.clone()))),
        )
        .step(Step::fetch("verify", EXISTING_POST_ID).expect_durable(
            Expectation::status(200).with(Predicate::MatchesFields(fields.clone())),
            Expectation::status(200).with(Predicate::DiffersFrom(fields)),
        ))
}

/// Deleting succeeds and the item is gone when persisted.
fn deletes_post() -> Scenario {
    Scenario::new("deletes-post", "a deleted post can no longer be read")
        .step(Step::delete("delete", EXISTING_POST_ID).expect(Expectation::status(200)))
        .step(
            Step::fetch("verify", EXISTING_POST_ID)
                .expect_durable(Expectation::status(404), Expectation::status(200)),
        )
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes a typed payload into its wire fields.
fn payload_fields<P: Serialize>(payload: &P) -> Map<String, Value> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
