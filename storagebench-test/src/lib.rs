//! Test utilities for storagebench.
//!
//! This crate provides utilities to facilitate testing of the benchmark harness and its host. See
//! the modules for all available utilities.

pub mod server;
pub mod tracing;
