//! Storage backend trait and implementations.
//!
//! This module defines the [`StorageBackend`] trait, which provides a unified
//! interface over the places packages live: a local library directory, a
//! mounted device, or an in-memory tree for tests.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::file::{DirListing, FileInfo};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::{Read, Write};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;
pub type BoxSyncWrite = Box<dyn Write + Send + 'static>;

/// Unified interface for storage backends.
///
/// All operations are asynchronous; device mounts in particular can block for
/// a long time, and callers bound them with [`listing`](crate::listing).
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use nspsync_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_or_zero(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("GameA/GameA [0100000000000000][v0].nsp");
///     if backend.exists(path).await? {
///         Ok(backend.stat(path).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// List all files, recursively, under an optional directory prefix.
    ///
    /// Collects [`list_stream()`](Self::list_stream) into a [`Vec`], failing
    /// on the first error. Callers that want to skip unreadable subtrees
    /// should consume the stream themselves.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata, recursively, under an optional prefix.
    ///
    /// Errors for one directory are yielded in place and the walk carries on
    /// with its siblings. Prefixes are matched per path component, so
    /// `GameA` never matches `GameAB/file.nsp`. A prefix that does not exist
    /// yields an empty stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::StreamExt;
    /// use std::path::Path;
    /// # use nspsync_storage::backend::StorageBackend;
    /// # async fn example(backend: &dyn StorageBackend) {
    /// let mut stream = backend.list_stream(Some(Path::new("GameA")));
    /// while let Some(item) = stream.next().await {
    ///     match item {
    ///         Ok(info) => println!("{}: {} bytes", info.path.display(), info.size),
    ///         Err(e) => eprintln!("skipping: {e:?}"),
    ///     }
    /// }
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// List the immediate contents of one directory (`None` for the root).
    ///
    /// A directory that doesn't exist lists as empty.
    async fn list_dir(&self, dir: Option<&Path>) -> Result<DirListing>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Open a file for streaming reads.
    ///
    /// Returns a `'static` boxed [`Read`] suitable for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking). Returns
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if the file does not
    /// exist.
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Open a file for streaming writes, truncating any existing file.
    ///
    /// # Notes
    /// - Implementations create parent directories as needed.
    /// - Callers must call `flush()` before dropping: some backends only
    ///   commit data on flush.
    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename/move a file within the same backend.
    ///
    /// Creates parent directories for the destination and overwrites an
    /// existing destination file.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;

    /// Absolute directory backing this storage, when it is a plain local
    /// directory. Lets callers move files between two local backends with a
    /// single rename instead of a copy.
    fn local_root(&self) -> Option<&Path> {
        None
    }

    /// Whether writes are discarded (dry-run).
    fn read_only(&self) -> bool {
        false
    }
}
