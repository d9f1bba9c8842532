use thiserror::Error;

use crate::backend::common::BackendError;

/// Errors that abort a benchmark invocation.
///
/// Backend failures during write, read or stat are not reported through this type. They are
/// captured as data in the [`BenchmarkReport`](crate::BenchmarkReport) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload could not be generated because the OS entropy source failed.
    #[error("failed to generate {size} byte payload")]
    Generation {
        size: u64,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The inbound request was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An error from one of the storage backends, raised outside of a timed operation.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Result type for harness operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
