use std::fmt::Debug;

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

/// User agent string used for outgoing requests.
pub const USER_AGENT: &str = concat!("storagebench/", env!("CARGO_PKG_VERSION"));

/// A type-erased [`Backend`] instance.
pub type BoxedBackend = Box<dyn Backend>;

/// The storage capabilities the harness measures.
#[async_trait::async_trait]
pub trait Backend: Debug + Send + Sync + 'static {
    /// The backend name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Stores the given contents at `key`, replacing any existing object.
    async fn put_object(&self, key: &str, contents: Bytes) -> BackendResult<()>;

    /// Retrieves the full contents stored at `key`.
    ///
    /// Returns [`BackendError::NotFound`] if there is no such object.
    async fn get_object(&self, key: &str) -> BackendResult<Bytes>;

    /// Returns the stored size of the object at `key` in bytes.
    async fn stat_size(&self, key: &str) -> BackendResult<u64>;
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// IO errors related to file operations.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// All errors stemming from the reqwest client used by the object store backend.
    ///
    /// These are network errors encountered when sending the requests or reading the response.
    #[error("reqwest error: {context}")]
    Reqwest {
        context: String,
        #[source]
        cause: reqwest::Error,
    },

    /// The remote answered with an unexpected status code.
    #[error("unexpected status {status} for `{key}`")]
    Status { status: StatusCode, key: String },

    /// The requested object does not exist.
    #[error("object `{key}` not found")]
    NotFound { key: String },

    /// The key does not address an object inside the backend.
    #[error("invalid object key `{key}`")]
    InvalidKey { key: String },

    /// The configured endpoint cannot be used as a base URL.
    #[error("invalid endpoint `{endpoint}`")]
    InvalidEndpoint { endpoint: String },

    /// The selected backend is not available in this deployment.
    #[error("{backend} backend is not configured")]
    NotConfigured { backend: &'static str },
}

impl BackendError {
    pub(crate) fn reqwest(context: impl Into<String>, cause: reqwest::Error) -> Self {
        Self::Reqwest {
            context: context.into(),
            cause,
        }
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Creates a reqwest client with required defaults.
pub fn reqwest_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
