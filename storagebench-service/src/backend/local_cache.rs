//! Local scratch copy of the last object read from the remote store.
//!
//! The cache holds a single file at a fixed path, shared by every invocation in the process. Its
//! [`CacheState`] records which file name the scratch copy belongs to, so that reads for a
//! different name are never served from it.
//!
//! # Consistency
//!
//! The state is guarded by a mutex, but the scratch file is not. An invocation for another file
//! name running concurrently can replace the scratch contents between the selector choosing the
//! cache and the read completing. Sequential invocations are unaffected.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;

use super::common::{Backend, BackendError, BackendResult};

/// Whether the scratch file holds a copy, and of which file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheState {
    /// Set once a remote read has been copied to the scratch file.
    pub populated: bool,
    /// The file name whose contents the scratch file holds.
    pub cached_key: Option<String>,
}

impl CacheState {
    /// Returns `true` if the scratch file holds the contents of `file_name`.
    pub fn holds(&self, file_name: &str) -> bool {
        self.populated && self.cached_key.as_deref() == Some(file_name)
    }
}

#[derive(Debug)]
pub struct LocalCache {
    scratch_path: PathBuf,
    state: Mutex<CacheState>,
}

impl LocalCache {
    pub fn new(scratch_path: &Path) -> Self {
        Self {
            scratch_path: scratch_path.into(),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The fixed path of the scratch file.
    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    /// Returns a snapshot of the current cache state.
    pub fn state(&self) -> CacheState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copies the contents of `file_name` into the scratch file and marks the cache populated.
    ///
    /// The state is invalidated before the file is replaced and only updated once the write has
    /// completed, so a failed write leaves the cache unpopulated.
    pub async fn populate(&self, file_name: &str, contents: &[u8]) -> BackendResult<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = CacheState::default();

        if let Some(parent) = self.scratch_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.scratch_path, contents).await?;

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = CacheState {
            populated: true,
            cached_key: Some(file_name.into()),
        };
        tracing::debug!(file_name, path = %self.scratch_path.display(), "Populated local cache");

        Ok(())
    }
}

#[async_trait::async_trait]
impl Backend for LocalCache {
    fn name(&self) -> &'static str {
        "local-cache"
    }

    /// The cache is only filled through [`LocalCache::populate`]; writes are ignored.
    async fn put_object(&self, _key: &str, _contents: Bytes) -> BackendResult<()> {
        Ok(())
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn get_object(&self, key: &str) -> BackendResult<Bytes> {
        tracing::debug!("Reading from local cache");
        match tokio::fs::read(&self.scratch_path).await {
            Ok(contents) => Ok(contents.into()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BackendError::NotFound { key: key.into() })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn stat_size(&self, key: &str) -> BackendResult<u64> {
        match tokio::fs::metadata(&self.scratch_path).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BackendError::NotFound { key: key.into() })
            }
            Err(err) => Err(err.into()),
        }
    }
}
