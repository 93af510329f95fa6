// crates/api-verify-core/src/client.rs
// ============================================================================
// Module: Posts Client
// Description: CRUD operations against the remote posts resource.
// Purpose: Map harness operations onto transport requests.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`PostsClient`] binds a [`Transport`] to a resource path (`/posts`) and
//! exposes the five remote operations. Non-2xx responses come back as
//! [`TransportError::Status`]; callers that anticipate a specific status use
//! [`capture_status`] to turn it into an ordinary response they can assert on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::post::PostId;
use crate::transport::ApiRequest;
use crate::transport::ApiResponse;
use crate::transport::Method;
use crate::transport::Transport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Client
// ============================================================================

/// CRUD client for a single REST collection.
#[derive(Debug, Clone)]
pub struct PostsClient<T> {
    /// Underlying transport.
    transport: T,
    /// Collection path, leading `/` and no trailing `/`.
    resource_path: String,
}

impl<T: Transport> PostsClient<T> {
    /// Creates a client for the collection at `resource_path`.
    #[must_use]
    pub fn new(transport: T, resource_path: &str) -> Self {
        let trimmed = resource_path.trim_end_matches('/');
        let resource_path =
            if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") };
        Self {
            transport,
            resource_path,
        }
    }

    /// Returns the underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the collection path.
    #[must_use]
    pub fn collection_path(&self) -> &str {
        &self.resource_path
    }

    /// Returns the path of a single item.
    #[must_use]
    pub fn item_path(&self, id: PostId) -> String {
        format!("{}/{id}", self.resource_path)
    }

    /// Lists the collection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on non-2xx responses or transport failure.
    pub async fn fetch_collection(&self) -> Result<ApiResponse, TransportError> {
        self.send(&ApiRequest::new(Method::Get, self.collection_path())).await
    }

    /// Reads a single item.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Status`] with 404 when the item is missing.
    pub async fn fetch_item(&self, id: PostId) -> Result<ApiResponse, TransportError> {
        self.send(&ApiRequest::new(Method::Get, self.item_path(id))).await
    }

    /// Creates an item from `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on encode failure, non-2xx responses, or
    /// transport failure.
    pub async fn create_item<P: Serialize + Sync>(
        &self,
        payload: &P,
    ) -> Result<ApiResponse, TransportError> {
        let request =
            ApiRequest::new(Method::Post, self.collection_path()).with_body(encode(payload)?);
        self.send(&request).await
    }

    /// Replaces fields of an existing item.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on encode failure, non-2xx responses, or
    /// transport failure.
    pub async fn update_item<P: Serialize + Sync>(
        &self,
        id: PostId,
        payload: &P,
    ) -> Result<ApiResponse, TransportError> {
        let request = ApiRequest::new(Method::Put, self.item_path(id)).with_body(encode(payload)?);
        self.send(&request).await
    }

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on non-2xx responses or transport failure.
    pub async fn delete_item(&self, id: PostId) -> Result<ApiResponse, TransportError> {
        self.send(&ApiRequest::new(Method::Delete, self.item_path(id))).await
    }

    /// Sends a prepared request through the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on non-2xx responses or transport failure.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.transport.send(request).await
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a [`TransportError::Status`] carrying `expected` into a response
/// so it can be asserted on. Every other error passes through unchanged.
///
/// # Errors
///
/// Returns the original error when it did not carry the expected status.
pub fn capture_status(
    result: Result<ApiResponse, TransportError>,
    expected: u16,
) -> Result<ApiResponse, TransportError> {
    match result {
        Err(TransportError::Status {
            status,
            body,
            body_bytes,
        }) if status == expected => Ok(ApiResponse {
            status,
            body,
            body_bytes,
        }),
        other => other,
    }
}

/// Encodes a request payload as JSON.
fn encode<P: Serialize>(payload: &P) -> Result<Value, TransportError> {
    serde_json::to_value(payload).map_err(|err| TransportError::Encode(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
