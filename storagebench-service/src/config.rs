use std::num::NonZeroU32;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How many backends an invocation exercises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkMode {
    /// A single write and read path, chosen by the [`BackendSelector`](crate::BackendSelector).
    #[default]
    Unified,
    /// Writes to and reads from both the mounted filesystem and the object store.
    Dual,
}

/// Settings for the benchmark harness, fixed for the lifetime of the process.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub mode: BenchmarkMode,
    /// Directory the filesystem is mounted at. Also prefixes object store keys.
    pub mount_path: Option<PathBuf>,
    pub bucket: String,
    /// Set in deployments that run inside the VPC, where the mounted filesystem is used.
    pub vpc_stack_name: Option<String>,
    pub read_iterations: NonZeroU32,
    /// Allow repeated reads of the same object to be served from the local cache.
    pub read_from_cache: bool,
}

impl BenchConfig {
    /// Whether this deployment writes to and reads from the mounted filesystem.
    pub fn uses_mounted_fs(&self) -> bool {
        self.vpc_stack_name.is_some()
    }

    /// The object store key for a file.
    ///
    /// The key is prefixed with the mount path even though the object store has no relation to
    /// the filesystem, so objects written by existing deployments stay addressable. Without a
    /// mount path the key is the bare file name.
    pub fn object_key(&self, file_name: &str) -> String {
        match &self.mount_path {
            Some(mount_path) => format!("{}/{file_name}", mount_path.display()),
            None => file_name.to_owned(),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            mode: BenchmarkMode::default(),
            mount_path: None,
            bucket: String::new(),
            vpc_stack_name: None,
            read_iterations: NonZeroU32::MIN,
            read_from_cache: false,
        }
    }
}
