// crates/api-verify-core/src/transport.rs
// ============================================================================
// Module: HTTP Transport
// Description: JSON-over-HTTP transport used by the verification harness.
// Purpose: Issue requests and surface non-2xx responses as catchable failures.
// Dependencies: async-trait, reqwest, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! The [`Transport`] trait is the seam between the harness and the network.
//! [`HttpTransport`] implements it with reqwest: 2xx responses return the
//! status and parsed JSON body, anything else becomes
//! [`TransportError::Status`] carrying the status code and error body.
//! Timeouts are enforced by the underlying client and are never retried.
//! Security posture: response bodies are untrusted. Bodies are streamed and
//! reading stops once the size limit is exceeded; parsing fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use reqwest::header::HeaderValue;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body size accepted by the transport.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// HTTP methods used by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// Returns the canonical method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
        }
    }
}

/// A single request issued by the harness.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the transport base URL (leading `/`).
    pub path: String,
    /// Optional JSON request body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Builds a request without a body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Successful response: status code plus parsed body. Headers are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body, absent when the body was empty.
    pub body: Option<Value>,
    /// Size of the body as received, in bytes.
    pub body_bytes: usize,
}

/// Transport failures.
///
/// # Invariants
/// - [`TransportError::Status`] is the only variant produced by a completed
///   HTTP exchange; every other variant means no usable response arrived.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("unexpected http status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error body when present (JSON, or the raw text as a string).
        body: Option<Value>,
        /// Size of the error body as received, in bytes.
        body_bytes: usize,
    },
    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Network(String),
    /// The request body could not be encoded as JSON.
    #[error("request encode error: {0}")]
    Encode(String),
    /// A 2xx body could not be decoded as JSON.
    #[error("response decode error: {0}")]
    Decode(String),
    /// Response body exceeds the size limit.
    #[error("response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Declared length, or the bytes read when reading stopped.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
    /// Transport could not be configured.
    #[error("transport config error: {0}")]
    Config(String),
}

impl TransportError {
    /// Returns the carried HTTP status for [`TransportError::Status`].
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status {
                status,
                ..
            } => Some(*status),
            _ => None,
        }
    }

    /// Returns a stable label for the failure kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status {
                ..
            } => "status",
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network",
            Self::Encode(_) => "encode",
            Self::Decode(_) => "decode",
            Self::ResponseTooLarge {
                ..
            } => "too_large",
            Self::Config(_) => "config",
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sends harness requests to a remote endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and waits for the response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Status`] for non-2xx responses and other
    /// variants when no usable response arrived.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).send(request).await
    }
}

// ============================================================================
// SECTION: Reqwest Transport
// ============================================================================

/// reqwest-backed transport bound to a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Base URL without a trailing slash.
    base_url: String,
    /// Shared HTTP client.
    client: Client,
    /// Maximum accepted body size in bytes.
    max_response_bytes: usize,
}

impl HttpTransport {
    /// Builds a transport with its own client and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] when the base URL is not an
    /// http(s) URL or the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Config(format!("failed to build http client: {err}")))?;
        Self::with_client(base_url, client)
    }

    /// Builds a transport from an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] when the base URL is not an
    /// http(s) URL.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, TransportError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| TransportError::Config(format!("invalid base url: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::Config(format!(
                "unsupported base url scheme: {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            max_response_bytes: MAX_RESPONSE_BYTES,
        })
    }

    /// Overrides the response size limit (defaults to [`MAX_RESPONSE_BYTES`]).
    #[must_use]
    pub const fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins the base URL with a request path, keeping any base path prefix.
    fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Url::parse(&joined).map_err(|err| TransportError::Config(format!("invalid url: {err}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(&request.path)?;
        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status();
        let bytes = read_body_limited(response, self.max_response_bytes).await?;
        if status.is_success() {
            let body = decode_body(&bytes)?;
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
                body_bytes: bytes.len(),
            });
        }
        Err(TransportError::Status {
            status: status.as_u16(),
            body: error_body(&bytes),
            body_bytes: bytes.len(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps reqwest failures onto transport error kinds.
fn classify_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Reads a response body chunk by chunk, failing once it exceeds `max_bytes`.
///
/// A declared `Content-Length` above the limit is rejected before any chunk
/// is read.
async fn read_body_limited(
    mut response: reqwest::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, TransportError> {
    if let Some(expected) = response.content_length() {
        let declared = usize::try_from(expected).unwrap_or(usize::MAX);
        if declared > max_bytes {
            return Err(TransportError::ResponseTooLarge {
                actual: declared,
                limit: max_bytes,
            });
        }
    }
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify_error)? {
        let actual = buf.len().saturating_add(chunk.len());
        if actual > max_bytes {
            return Err(TransportError::ResponseTooLarge {
                actual,
                limit: max_bytes,
            });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Parses a success body; empty or whitespace-only bodies are absent.
fn decode_body(bytes: &[u8]) -> Result<Option<Value>, TransportError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|err| TransportError::Decode(format!("invalid json body: {err}")))
}

/// Keeps error bodies even when they are not JSON.
fn error_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice(bytes)
        .ok()
        .or_else(|| Some(Value::String(String::from_utf8_lossy(bytes).into_owned())))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
