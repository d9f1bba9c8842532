//! In-memory backend for tests.
//!
//! This provides a [`Backend`](super::common::Backend) backed by a `HashMap`, removing the need for
//! filesystem tempdir management or a fake remote in unit tests. The backend is [`Clone`] so tests
//! can hold a handle for direct inspection while the runner owns a boxed copy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::common::{Backend, BackendError, BackendResult};

type Store = HashMap<String, Bytes>;

#[derive(Debug, Clone)]
pub(crate) struct InMemoryBackend {
    name: &'static str,
    store: Arc<Mutex<Store>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl InMemoryBackend {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            store: Default::default(),
            fail_writes: Default::default(),
            fail_reads: Default::default(),
            reads: Default::default(),
        }
    }

    /// Returns a clone of the stored bytes, if present.
    pub fn get_stored(&self, key: &str) -> Option<Bytes> {
        self.store.lock().unwrap().get(key).cloned()
    }

    /// Stores an entry directly, bypassing the `Backend` trait.
    pub fn insert(&self, key: &str, contents: &'static [u8]) {
        self.store
            .lock()
            .unwrap()
            .insert(key.into(), Bytes::from_static(contents));
    }

    /// Makes every subsequent write fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::Relaxed);
    }

    /// Makes every subsequent read and stat fail.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::Relaxed);
    }

    /// The number of successful `get_object` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn simulated_failure(&self, op: &str) -> BackendError {
        BackendError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            format!("simulated {op} failure in {}", self.name),
        ))
    }
}

#[async_trait::async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn put_object(&self, key: &str, contents: Bytes) -> BackendResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(self.simulated_failure("write"));
        }
        self.store.lock().unwrap().insert(key.into(), contents);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> BackendResult<Bytes> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(self.simulated_failure("read"));
        }
        let contents = self
            .get_stored(key)
            .ok_or_else(|| BackendError::NotFound { key: key.into() })?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(contents)
    }

    async fn stat_size(&self, key: &str) -> BackendResult<u64> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(self.simulated_failure("stat"));
        }
        self.get_stored(key)
            .map(|contents| contents.len() as u64)
            .ok_or_else(|| BackendError::NotFound { key: key.into() })
    }
}
