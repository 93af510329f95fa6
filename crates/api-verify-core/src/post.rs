// crates/api-verify-core/src/post.rs
// ============================================================================
// Module: Post Resource Types
// Description: Typed wire models for the remote posts resource.
// Purpose: Replace duck-typed property checks with explicit structures.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Wire models for the `posts` resource. Field names serialize in the remote
//! camelCase form (`userId`). Identifiers are plain unsigned integers wrapped in
//! [`PostId`] so they cannot be confused with user identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fields every post object must carry.
pub const POST_FIELDS: [&str; 4] = ["userId", "id", "title", "body"];

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Post identifier assigned by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(u64);

impl PostId {
    /// Creates a new post identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PostId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Resource Types
// ============================================================================

/// A post as returned by read operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Owning user identifier.
    pub user_id: u64,
    /// Post identifier.
    pub id: PostId,
    /// Post title.
    pub title: String,
    /// Post body text.
    pub body: String,
}

/// Payload for creating a post; the service assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// Owning user identifier.
    pub user_id: u64,
    /// Post title.
    pub title: String,
    /// Post body text.
    pub body: String,
}

/// Partial update payload; absent fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    /// Replacement user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    /// Replacement title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Replacement body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}
