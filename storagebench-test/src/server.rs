//! Exposes an in-process fake object store for use in tests.
//!
//! ```
//! use storagebench_test::server::FakeObjectStore;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = FakeObjectStore::new().await;
//!    let endpoint = server.endpoint();
//!    // point an object store client at `{endpoint}/{bucket}/{key}`...
//! }
//! ```

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

#[derive(Debug, Default)]
struct Inner {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_writes: AtomicBool,
    token: Mutex<Option<String>>,
}

/// A minimal path-style object store served over HTTP.
///
/// Objects are kept in memory, keyed by the full request path (`/{bucket}/{key}`). `PUT` stores
/// the request body, `GET` returns it or `404`. The server listens on a random port on localhost
/// and stops when dropped.
#[derive(Debug)]
pub struct FakeObjectStore {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    inner: Arc<Inner>,
}

impl FakeObjectStore {
    pub async fn new() -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let inner = Arc::new(Inner::default());
        let app = Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&inner));

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            handle,
            socket,
            inner,
        }
    }

    /// The base URL to configure as object store endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.socket.port())
    }

    /// Returns the object stored at the given request path, e.g. `/bucket/key`.
    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.inner.objects.lock().unwrap().get(path).cloned()
    }

    /// Answers all subsequent writes with `503 Service Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Rejects requests that do not carry `Authorization: Bearer {token}`.
    pub fn require_token(&self, token: &str) {
        *self.inner.token.lock().unwrap() = Some(token.to_owned());
    }
}

impl Drop for FakeObjectStore {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    State(inner): State<Arc<Inner>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let expected = inner.token.lock().unwrap().clone();
    if let Some(token) = expected {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if authorization != Some(format!("Bearer {token}").as_str()) {
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let path = uri.path().to_owned();
    match method {
        Method::PUT => {
            if inner.fail_writes.load(Ordering::Relaxed) {
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
            inner.objects.lock().unwrap().insert(path, body);
            StatusCode::OK.into_response()
        }
        Method::GET => match inner.objects.lock().unwrap().get(&path) {
            Some(contents) => contents.clone().into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}
