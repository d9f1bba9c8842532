//! The storagebench host.
//!
//! This builds on top of the [`storagebench_service`] harness and exposes benchmark invocations
//! over `HTTP` and on the command line. See [`cli::execute`] for the entry point.
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod healthcheck;
pub mod observability;
pub mod state;
pub mod web;
