//! Chooses which backend serves each operation of an invocation.

use std::fmt;

use serde::Serialize;

use crate::backend::local_cache::CacheState;
use crate::config::BenchConfig;

/// A storage backend an operation can be directed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    MountedFilesystem,
    RemoteObjectStore,
    LocalCache,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::MountedFilesystem => "mounted filesystem",
            Target::RemoteObjectStore => "remote object store",
            Target::LocalCache => "local cache",
        })
    }
}

/// Backend selection policy for unified-mode invocations.
///
/// Every decision is a pure function of the configuration and the cache state passed in, so the
/// read target can be evaluated again before each read iteration.
#[derive(Clone, Copy, Debug)]
pub struct BackendSelector<'a> {
    config: &'a BenchConfig,
}

impl<'a> BackendSelector<'a> {
    pub fn new(config: &'a BenchConfig) -> Self {
        Self { config }
    }

    pub fn write_target(&self) -> Target {
        if self.config.uses_mounted_fs() {
            Target::MountedFilesystem
        } else {
            Target::RemoteObjectStore
        }
    }

    /// The cache is only offered if it was enabled, has been populated, and holds `file_name`.
    pub fn read_target(&self, cache: &CacheState, file_name: &str) -> Target {
        if self.config.uses_mounted_fs() {
            Target::MountedFilesystem
        } else if self.config.read_from_cache && cache.holds(file_name) {
            Target::LocalCache
        } else {
            Target::RemoteObjectStore
        }
    }

    /// The size is reported from wherever the object was written.
    pub fn stat_target(&self) -> Target {
        self.write_target()
    }
}
