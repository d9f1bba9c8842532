use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::common::{Backend, BackendError, BackendResult};

/// A filesystem mounted into the process, such as a network share.
///
/// Objects are plain files at `{root}/{key}`. Keys are relative paths that stay below the root.
#[derive(Debug)]
pub struct MountedFsBackend {
    root: PathBuf,
}

impl MountedFsBackend {
    pub fn new(root: &Path) -> Self {
        Self { root: root.into() }
    }

    /// The file path an object key resolves to.
    ///
    /// Returns [`BackendError::InvalidKey`] for absolute keys and keys with `..` components.
    pub fn path(&self, key: &str) -> BackendResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));

        if key.is_empty() || escapes {
            return Err(BackendError::InvalidKey { key: key.into() });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl Backend for MountedFsBackend {
    fn name(&self) -> &'static str {
        "mounted-fs"
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn put_object(&self, key: &str, contents: Bytes) -> BackendResult<()> {
        let path = self.path(key)?;
        tracing::debug!(path = %path.display(), "Writing to mounted filesystem");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&contents).await?;
        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_data().await?;

        Ok(())
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn get_object(&self, key: &str) -> BackendResult<Bytes> {
        let path = self.path(key)?;
        tracing::debug!(path = %path.display(), "Reading from mounted filesystem");

        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(contents.into()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BackendError::NotFound { key: key.into() })
            }
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn stat_size(&self, key: &str) -> BackendResult<u64> {
        let path = self.path(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BackendError::NotFound { key: key.into() })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_and_reads_files() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = MountedFsBackend::new(tempdir.path());

        backend
            .put_object("nested/a.bin", Bytes::from_static(b"oh hai!"))
            .await
            .unwrap();

        let contents = backend.get_object("nested/a.bin").await.unwrap();
        assert_eq!(contents.as_ref(), b"oh hai!");
        assert_eq!(backend.stat_size("nested/a.bin").await.unwrap(), 7);
        assert!(tempdir.path().join("nested/a.bin").is_file());
    }

    #[tokio::test]
    async fn overwrites_existing_files() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = MountedFsBackend::new(tempdir.path());

        backend
            .put_object("a.bin", Bytes::from_static(b"first contents"))
            .await
            .unwrap();
        backend
            .put_object("a.bin", Bytes::from_static(b"second"))
            .await
            .unwrap();

        let contents = backend.get_object("a.bin").await.unwrap();
        assert_eq!(contents.as_ref(), b"second");
        assert_eq!(backend.stat_size("a.bin").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = MountedFsBackend::new(tempdir.path());

        let err = backend.get_object("missing.bin").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound { .. }));

        let err = backend.stat_size("missing.bin").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound { .. }));
    }

    #[tokio::test]
    async fn keys_stay_below_root() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let backend = MountedFsBackend::new(root.path());

        let absolute = outside.path().join("escaped.bin");
        let absolute = absolute.to_str().unwrap();
        let err = backend
            .put_object(absolute, Bytes::from_static(b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidKey { .. }));
        assert!(!outside.path().join("escaped.bin").exists());

        let err = backend
            .put_object("../escaped.bin", Bytes::from_static(b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidKey { .. }));
        assert!(!root.path().join("../escaped.bin").exists());

        let err = backend.get_object("a/../../escaped.bin").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidKey { .. }));
        let err = backend.stat_size("/etc/hostname").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidKey { .. }));
    }
}
