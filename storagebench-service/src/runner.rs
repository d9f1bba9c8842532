//! Orchestration of a single benchmark invocation.
//!
//! An invocation always moves through the same stages: generate the payload, write it, read it
//! back `read_iterations` times, check the stored size, and aggregate. Only payload generation can
//! abort it. Any backend failure along the way is recorded as an error timing and the remaining
//! stages still run.
//!
//! Operations of one invocation never overlap, so each latency is measured without contention
//! from the invocation itself.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::backend::common::{Backend, BackendError, BackendResult, BoxedBackend};
use crate::backend::local_cache::LocalCache;
use crate::backend::mounted_fs::MountedFsBackend;
use crate::backend::s3_compatible::S3CompatibleBackend;
use crate::config::{BenchConfig, BenchmarkMode};
use crate::error::Result;
use crate::payload;
use crate::report::{BenchmarkReport, OperationRecord, SizeResult};
use crate::request::BenchmarkRequest;
use crate::selector::{BackendSelector, Target};
use crate::timing::{Operation, Timed, TimingResult, timed};

/// Connection settings for the remote object store.
#[derive(Clone, Copy, Debug)]
pub struct ObjectStoreConfig<'a> {
    /// Base URL of the S3-compatible endpoint.
    pub endpoint: &'a str,
    /// Optional bearer token sent with every request.
    pub token: Option<&'a str>,
}

/// The backends available to the runner.
///
/// A backend that is `None` is not part of this deployment. Operations directed at it fail with
/// [`BackendError::NotConfigured`].
#[derive(Debug)]
pub struct Backends {
    pub mounted_fs: Option<BoxedBackend>,
    pub object_store: Option<BoxedBackend>,
    pub cache: Arc<LocalCache>,
}

/// Runs benchmark invocations against the configured backends.
///
/// The runner is shared by all invocations of the process. Its [`LocalCache`] carries state from
/// one invocation to the next.
#[derive(Debug)]
pub struct BenchmarkRunner {
    config: BenchConfig,
    backends: Backends,
}

impl BenchmarkRunner {
    /// Creates a runner with the real backends for the given configuration.
    ///
    /// The mounted filesystem is available if a mount path is configured, the object store if a
    /// bucket is configured.
    pub fn new(
        config: BenchConfig,
        object_store: ObjectStoreConfig<'_>,
        cache_path: &Path,
    ) -> Self {
        let mounted_fs = config
            .mount_path
            .as_deref()
            .map(|path| Box::new(MountedFsBackend::new(path)) as BoxedBackend);
        let remote = (!config.bucket.is_empty()).then(|| {
            Box::new(S3CompatibleBackend::new(
                object_store.endpoint,
                &config.bucket,
                object_store.token,
            )) as BoxedBackend
        });

        let backends = Backends {
            mounted_fs,
            object_store: remote,
            cache: Arc::new(LocalCache::new(cache_path)),
        };
        Self::from_backends(config, backends)
    }

    /// Creates a runner from pre-built backends.
    pub fn from_backends(config: BenchConfig, backends: Backends) -> Self {
        Self { config, backends }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn cache(&self) -> &LocalCache {
        &self.backends.cache
    }

    /// Runs one invocation.
    ///
    /// Fails only if the request is invalid or the payload cannot be generated. Backend failures
    /// are part of the returned report.
    #[tracing::instrument(skip_all, fields(file_name = %request.file_name, file_size = request.file_size))]
    pub async fn run(&self, request: &BenchmarkRequest) -> Result<BenchmarkReport> {
        request.validate()?;

        let payload = payload::generate(request.file_size)?;
        let contents = payload::encode(&payload);
        drop(payload);

        let report = match self.config.mode {
            BenchmarkMode::Unified => self.run_unified(&request.file_name, contents).await,
            BenchmarkMode::Dual => self.run_dual(&request.file_name, contents).await,
        };

        if let SizeResult::Bytes(file_size_bytes) = report.file_size {
            tracing::info!(file_size_bytes, "File size: {file_size_bytes} bytes");
        }

        Ok(report)
    }

    async fn run_unified(&self, file_name: &str, contents: Bytes) -> BenchmarkReport {
        let selector = BackendSelector::new(&self.config);

        let write_target = selector.write_target();
        let writes = vec![self.write(write_target, file_name, contents).await];

        let mut reads = Vec::with_capacity(self.read_iterations());
        for _ in 0..self.read_iterations() {
            let target = selector.read_target(&self.backends.cache.state(), file_name);
            let Timed { timing, value } = self.read(target, file_name).await;

            if target == Target::RemoteObjectStore
                && let Some(contents) = value
                && let Err(err) = self.backends.cache.populate(file_name, &contents).await
            {
                tracing::warn!(
                    error = &err as &dyn std::error::Error,
                    "failed to populate local cache"
                );
            }

            reads.push(OperationRecord { target, timing });
        }

        let file_size = self.stat(selector.stat_target(), file_name).await;

        BenchmarkReport {
            mode: BenchmarkMode::Unified,
            writes,
            reads,
            file_size,
        }
    }

    async fn run_dual(&self, file_name: &str, contents: Bytes) -> BenchmarkReport {
        let writes = vec![
            self.write(Target::MountedFilesystem, file_name, contents.clone())
                .await,
            self.write(Target::RemoteObjectStore, file_name, contents).await,
        ];

        let mut reads = Vec::with_capacity(2 * self.read_iterations());
        for _ in 0..self.read_iterations() {
            for target in [Target::MountedFilesystem, Target::RemoteObjectStore] {
                let Timed { timing, .. } = self.read(target, file_name).await;
                reads.push(OperationRecord { target, timing });
            }
        }

        let file_size = self.stat(Target::MountedFilesystem, file_name).await;

        BenchmarkReport {
            mode: BenchmarkMode::Dual,
            writes,
            reads,
            file_size,
        }
    }

    fn read_iterations(&self) -> usize {
        self.config.read_iterations.get() as usize
    }

    fn backend(&self, target: Target) -> BackendResult<&dyn Backend> {
        let backend = match target {
            Target::MountedFilesystem => self.backends.mounted_fs.as_deref(),
            Target::RemoteObjectStore => self.backends.object_store.as_deref(),
            Target::LocalCache => Some(self.backends.cache.as_ref() as &dyn Backend),
        };

        backend.ok_or(BackendError::NotConfigured {
            backend: match target {
                Target::MountedFilesystem => "mounted filesystem",
                Target::RemoteObjectStore => "object store",
                Target::LocalCache => "local cache",
            },
        })
    }

    fn key(&self, target: Target, file_name: &str) -> String {
        match target {
            Target::RemoteObjectStore => self.config.object_key(file_name),
            Target::MountedFilesystem | Target::LocalCache => file_name.to_owned(),
        }
    }

    async fn write(&self, target: Target, file_name: &str, contents: Bytes) -> OperationRecord {
        let key = self.key(target, file_name);
        tracing::debug!(%target, %key, "Attempting to write file");

        let backend = self.backend(target);
        let Timed { timing, .. } = timed(Operation::Write, async {
            backend?.put_object(&key, contents).await
        })
        .await;

        OperationRecord { target, timing }
    }

    async fn read(&self, target: Target, file_name: &str) -> Timed<Bytes> {
        let key = self.key(target, file_name);
        tracing::debug!(%target, %key, "Attempting to read file");

        let backend = self.backend(target);
        let read = timed(Operation::Read, async { backend?.get_object(&key).await }).await;

        if let Some(contents) = &read.value {
            tracing::debug!(%target, "Retrieved {} bytes", contents.len());
        }
        read
    }

    async fn stat(&self, target: Target, file_name: &str) -> SizeResult {
        let key = self.key(target, file_name);

        let backend = self.backend(target);
        let Timed { timing, value } =
            timed(Operation::Stat, async { backend?.stat_size(&key).await }).await;

        match (value, timing) {
            (Some(size), _) => SizeResult::Bytes(size),
            (None, TimingResult::Error(message)) => SizeResult::Error(message),
            (None, TimingResult::Elapsed(_)) => SizeResult::Error("Stat error: no size".into()),
        }
    }
}
