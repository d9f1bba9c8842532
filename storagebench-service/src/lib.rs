//! The benchmarking harness.
//!
//! Each invocation generates a random payload, writes it to a storage backend, reads it back a
//! configurable number of times and reports the latency of every operation together with the
//! stored size of the object. See [`BenchmarkRunner`] for the entry point.
//!
//! Backend failures never abort an invocation. They are captured in the [`BenchmarkReport`] as
//! error messages in place of the timing, so callers always get a well-formed response.
#![warn(missing_debug_implementations)]

pub mod backend;
pub mod config;
pub mod error;
pub mod payload;
pub mod report;
pub mod request;
pub mod runner;
pub mod selector;
pub mod timing;

pub use config::{BenchConfig, BenchmarkMode};
pub use error::{Error, Result};
pub use report::{BenchmarkReport, BenchmarkResponse, SizeResult};
pub use request::BenchmarkRequest;
pub use runner::{Backends, BenchmarkRunner, ObjectStoreConfig};
pub use selector::{BackendSelector, Target};
pub use timing::TimingResult;
