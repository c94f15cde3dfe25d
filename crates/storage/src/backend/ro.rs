//! Read-only storage backend, used for dry runs.
//!
//! Wraps another backend, forwards every read, and turns every write into a
//! logged no-op that reports success.

use async_trait::async_trait;
use std::path::Path;

use crate::backend::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::{BackendHandle, StorageBackend, error::Result, file::DirListing, file::FileInfo};

/// Read-only storage backend.
///
/// Writes vanish: [`writer()`](StorageBackend::writer) hands back a sink, and
/// deletes and renames only emit an [`info event`](tracing::Event). The
/// wrapped directory is deliberately hidden from
/// [`local_root()`](StorageBackend::local_root) so nobody can rename around
/// the wrapper.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn list_dir(&self, dir: Option<&Path>) -> Result<DirListing> {
        self.inner.list_dir(dir).await
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        self.inner.reader(path).await
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        tracing::info!(path = %path.display(), "Skipping write during read-only mode");
        Ok(Box::new(std::io::sink()))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping delete during read-only mode");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(from = %from.display(), to = %to.display(), "Skipping move during read-only mode");
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path).await
    }

    fn read_only(&self) -> bool {
        true
    }
}
