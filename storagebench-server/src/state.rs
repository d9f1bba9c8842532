use std::sync::Arc;

use storagebench_service::BenchmarkRunner;

use crate::config::Config;

/// Shared reference to the storagebench [service state](State).
pub type ServiceState = Arc<State>;

/// Reference to the benchmark harness.
///
/// This structure is created during startup and shared with all HTTP request handlers. All
/// invocations run through the same [`BenchmarkRunner`], so they share its local cache.
///
/// In request handlers, use `axum::extract::State<ServiceState>` to retrieve a shared reference to
/// this structure.
#[derive(Debug)]
pub struct State {
    /// The host configuration.
    pub config: Config,
    /// The benchmark runner.
    pub runner: BenchmarkRunner,
}

impl State {
    pub fn new(config: Config) -> ServiceState {
        let runner = BenchmarkRunner::new(
            config.bench_config(),
            config.object_store_config(),
            &config.cache_path,
        );

        Arc::new(Self { config, runner })
    }
}
