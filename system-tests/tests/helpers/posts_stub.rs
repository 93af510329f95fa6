// system-tests/tests/helpers/posts_stub.rs
// ============================================================================
// Module: Posts Stub
// Description: Local posts REST service for system-tests.
// Purpose: Exercise the verification suite over real HTTP without the network.
// Dependencies: axum, api-verify-core, tokio
// ============================================================================

use std::collections::BTreeMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use api_verify_core::BackendMode;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::Method;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Number of posts seeded at startup, matching the public fixture service.
pub const SEEDED_POSTS: u64 = 100;

/// Injected behavior for requests to one path.
#[derive(Clone, Debug)]
pub enum Fault {
    /// Answer with this status and an empty JSON object.
    Status(u16),
    /// Wait before handling the request normally.
    Delay(Duration),
    /// Answer 200 with a body that is not JSON.
    MalformedBody,
    /// Answer 200 with this body instead of the stored resource.
    Body(Value),
    /// Answer 200 with a JSON string body of exactly this many bytes.
    OversizedBody(usize),
}

/// Stub behavior shared by every request.
#[derive(Clone, Debug)]
pub struct PostsStubOptions {
    /// Whether writes are applied to the store.
    pub mode: BackendMode,
    /// Faults keyed by request path (for example `/posts/1`).
    pub faults: BTreeMap<String, Fault>,
}

impl PostsStubOptions {
    /// Options for a fault-free stub in `mode`.
    pub fn new(mode: BackendMode) -> Self {
        Self {
            mode,
            faults: BTreeMap::new(),
        }
    }

    /// Adds a fault for `path`.
    #[must_use]
    pub fn with_fault(mut self, path: &str, fault: Fault) -> Self {
        self.faults.insert(path.to_string(), fault);
        self
    }
}

/// Recorded request metadata for stub calls.
#[derive(Clone, Debug, Serialize)]
pub struct StubRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct StubState {
    options: Arc<PostsStubOptions>,
    posts: Arc<Mutex<BTreeMap<u64, Value>>>,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubState {
    fn persists(&self) -> bool {
        self.options.mode == BackendMode::Persisting
    }
}

/// Handle for the posts stub server.
pub struct PostsStubHandle {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
    posts: Arc<Mutex<BTreeMap<u64, Value>>>,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl PostsStubHandle {
    /// Returns the stub base URL (no resource path).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns captured requests in arrival order.
    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Returns the stored post with `id`, if any.
    pub fn stored(&self, id: u64) -> Option<Value> {
        self.posts.lock().ok().and_then(|posts| posts.get(&id).cloned())
    }
}

impl Drop for PostsStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawn a fault-free posts stub in `mode`.
pub async fn spawn_posts_stub(mode: BackendMode) -> Result<PostsStubHandle, String> {
    spawn_posts_stub_with(PostsStubOptions::new(mode)).await
}

/// Spawn a posts stub with explicit options.
#[allow(clippy::unused_async, reason = "Async signature keeps helper API consistent in tests.")]
pub async fn spawn_posts_stub_with(options: PostsStubOptions) -> Result<PostsStubHandle, String> {
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("posts stub bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("posts stub listener nonblocking failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("posts stub local addr failed: {err}"))?;
    let base_url = format!("http://{addr}");

    let posts = Arc::new(Mutex::new(seed_posts()));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        options: Arc::new(options),
        posts: Arc::clone(&posts),
        requests: Arc::clone(&requests),
    };
    let app = Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(fetch_post).put(update_post).delete(delete_post))
        .with_state(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(PostsStubHandle {
        base_url,
        shutdown: Some(shutdown_tx),
        join: Some(join),
        posts,
        requests,
    })
}

fn seed_posts() -> BTreeMap<u64, Value> {
    (1..=SEEDED_POSTS)
        .map(|id| {
            let post = json!({
                "userId": (id - 1) / 10 + 1,
                "id": id,
                "title": format!("seeded title {id}"),
                "body": format!("seeded body {id}")
            });
            (id, post)
        })
        .collect()
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

async fn list_posts(State(state): State<StubState>) -> Response {
    if let Some(response) = intercept(&state, &Method::GET, "/posts", None).await {
        return response;
    }
    let posts: Vec<Value> =
        state.posts.lock().map(|posts| posts.values().cloned().collect()).unwrap_or_default();
    json_response(StatusCode::OK, Value::Array(posts))
}

async fn fetch_post(State(state): State<StubState>, Path(raw): Path<String>) -> Response {
    let path = format!("/posts/{raw}");
    if let Some(response) = intercept(&state, &Method::GET, &path, None).await {
        return response;
    }
    let found = parse_id(&raw).and_then(|id| stored_post(&state, id));
    found.map_or_else(not_found, |post| json_response(StatusCode::OK, post))
}

async fn create_post(State(state): State<StubState>, bytes: Bytes) -> Response {
    let body = parse_body(&bytes);
    if let Some(response) = intercept(&state, &Method::POST, "/posts", body.clone()).await {
        return response;
    }
    let Some(Value::Object(fields)) = body else {
        return json_response(StatusCode::BAD_REQUEST, json!({"error": "expected json object"}));
    };
    let Ok(mut posts) = state.posts.lock() else {
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({}));
    };
    let id = posts.keys().next_back().copied().unwrap_or(0).max(SEEDED_POSTS) + 1;
    let mut post = Value::Object(fields);
    post["id"] = json!(id);
    if state.persists() {
        posts.insert(id, post.clone());
    }
    json_response(StatusCode::CREATED, post)
}

async fn update_post(
    State(state): State<StubState>,
    Path(raw): Path<String>,
    bytes: Bytes,
) -> Response {
    let path = format!("/posts/{raw}");
    let body = parse_body(&bytes);
    if let Some(response) = intercept(&state, &Method::PUT, &path, body.clone()).await {
        return response;
    }
    let Some(id) = parse_id(&raw) else {
        return not_found();
    };
    let Ok(mut posts) = state.posts.lock() else {
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({}));
    };
    let Some(mut post) = posts.get(&id).cloned() else {
        return not_found();
    };
    if let (Some(target), Some(Value::Object(patch))) = (post.as_object_mut(), body) {
        for (key, value) in patch {
            target.insert(key, value);
        }
        target.insert("id".to_string(), json!(id));
    }
    if state.persists() {
        posts.insert(id, post.clone());
    }
    json_response(StatusCode::OK, post)
}

async fn delete_post(State(state): State<StubState>, Path(raw): Path<String>) -> Response {
    let path = format!("/posts/{raw}");
    if let Some(response) = intercept(&state, &Method::DELETE, &path, None).await {
        return response;
    }
    if state.persists() {
        if let (Some(id), Ok(mut posts)) = (parse_id(&raw), state.posts.lock()) {
            posts.remove(&id);
        }
    }
    json_response(StatusCode::OK, json!({}))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Records the request and applies any fault configured for `path`.
async fn intercept(
    state: &StubState,
    method: &Method,
    path: &str,
    body: Option<Value>,
) -> Option<Response> {
    if let Ok(mut guard) = state.requests.lock() {
        guard.push(StubRequest {
            method: method.to_string(),
            path: path.to_string(),
            body,
        });
    }
    match state.options.faults.get(path)? {
        Fault::Status(status) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Some(json_response(status, json!({})))
        }
        Fault::Delay(delay) => {
            sleep(*delay).await;
            None
        }
        Fault::MalformedBody => Some((StatusCode::OK, "<html>not json</html>").into_response()),
        Fault::Body(value) => Some(json_response(StatusCode::OK, value.clone())),
        Fault::OversizedBody(bytes) => {
            let filler = "x".repeat(bytes.saturating_sub(2));
            Some(json_response(StatusCode::OK, Value::String(filler)))
        }
    }
}

fn stored_post(state: &StubState, id: u64) -> Option<Value> {
    state.posts.lock().ok().and_then(|posts| posts.get(&id).cloned())
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn parse_body(bytes: &Bytes) -> Option<Value> {
    serde_json::from_slice(bytes).ok()
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, axum::Json(body)).into_response()
}

fn not_found() -> Response {
    json_response(StatusCode::NOT_FOUND, json!({}))
}
