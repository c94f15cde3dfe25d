//! In-memory storage backend for testing.

use super::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::{DirListing, FileInfo};
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

type Files = Arc<RwLock<BTreeMap<PathBuf, Vec<u8>>>>;

/// In-memory storage backend for testing.
///
/// Files live in a sorted map, so listings come back in a stable order. The
/// lock is a plain [`std::sync::RwLock`] that is never held across an await,
/// which lets [`writer()`](StorageBackend::writer) commit from blocking code.
///
/// Two knobs simulate a misbehaving device: [`with_latency`](Self::with_latency)
/// delays every listing, and [`fail_on`](Self::fail_on) makes every operation
/// at or below a path fail.
///
/// # Examples
///
/// ```
/// use nspsync_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("GameA/GameA [0100000000000000][v0].nsp", b"base".to_vec()),
/// ]);
/// assert!(backend.exists(Path::new("GameA/GameA [0100000000000000][v0].nsp")).await?);
/// backend.insert("GameA/GameA [0100000000000800][v65536].nsp", 10).await;
/// assert_eq!(backend.paths().await.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    files: Files,
    failing: RwLock<BTreeSet<PathBuf>>,
    latency: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            files: Arc::default(),
            failing: RwLock::default(),
            latency: None,
        }
    }

    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation: a broken fixture should never
    /// let a test pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            files: Arc::new(RwLock::new(map)),
            ..Self::new()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Delay every listing by `latency`. Pair with a paused tokio clock to
    /// exercise deadlines without waiting for them.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a file of `size` filler bytes. Panics on an invalid path.
    pub async fn insert(&self, path: impl AsRef<Path>, size: usize) {
        self.insert_data(path, vec![b'#'; size]).await;
    }

    /// Add a file with the given contents. Panics on an invalid path.
    pub async fn insert_data(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        let Ok(validated) = validate_path(path.as_ref()) else {
            panic!("MockBackend::insert: invalid path {}", path.as_ref().display());
        };
        self.files.write().unwrap_or_else(PoisonError::into_inner).insert(validated, data.into());
    }

    /// Make every operation on `path`, or anything below it, fail with a
    /// backend error.
    pub async fn fail_on(&self, path: impl AsRef<Path>) {
        let Ok(validated) = validate_path(path.as_ref()) else {
            panic!("MockBackend::fail_on: invalid path {}", path.as_ref().display());
        };
        self.failing.write().unwrap_or_else(PoisonError::into_inner).insert(validated);
    }

    /// Every stored path, sorted.
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.files.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    /// Contents of a stored file.
    pub async fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let validated = validate_path(path.as_ref()).ok()?;
        self.files.read().unwrap_or_else(PoisonError::into_inner).get(&validated).cloned()
    }

    fn check(&self, path: &Path) -> Result<()> {
        let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing.iter().any(|broken| path.starts_with(broken)) {
            exn::bail!(ErrorKind::BackendError(format!("simulated failure at {}", path.display())));
        }
        Ok(())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffers writes and stores them when flushed.
struct MockWriter {
    files: Files,
    path: PathBuf,
    buffer: Vec<u8>,
}
impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.path.clone(), self.buffer.clone());
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            self.delay().await;
            // Snapshot under the lock, then yield without it.
            let entries: Vec<(PathBuf, u64)> = {
                let guard = self.files.read().unwrap_or_else(PoisonError::into_inner);
                guard
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .map(|(path, data)| (path.clone(), data.len() as u64))
                    .collect()
            };
            for (path, size) in entries {
                match self.check(&path) {
                    Ok(()) => yield Ok(FileInfo::new(path, size)),
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn list_dir(&self, dir: Option<&Path>) -> Result<DirListing> {
        let dir = dir.map(validate_path).transpose()?;
        self.delay().await;
        let base = dir.unwrap_or_default();
        if !base.as_os_str().is_empty() {
            self.check(&base)?;
        }
        let guard = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let mut listing = DirListing::default();
        let mut dirs = BTreeSet::new();
        for (path, data) in guard.iter() {
            let Ok(rest) = path.strip_prefix(&base) else {
                continue;
            };
            let mut components = rest.components();
            let Some(first) = components.next() else {
                continue;
            };
            match components.next() {
                None => listing.files.push(FileInfo::new(path.clone(), data.len() as u64)),
                Some(_) => {
                    dirs.insert(base.join(first));
                },
            }
        }
        listing.dirs = dirs.into_iter().collect();
        Ok(listing)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        self.check(&path)?;
        Ok(self.files.read().unwrap_or_else(PoisonError::into_inner).contains_key(&path))
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let path = validate_path(path)?;
        self.check(&path)?;
        let data = self.files.read().unwrap_or_else(PoisonError::into_inner).get(&path).cloned();
        let data = data.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let path = validate_path(path)?;
        self.check(&path)?;
        Ok(Box::new(MockWriter {
            files: Arc::clone(&self.files),
            path,
            buffer: Vec::new(),
        }))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.check(&path)?;
        let removed = self.files.write().unwrap_or_else(PoisonError::into_inner).remove(&path);
        removed.map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        self.check(&from)?;
        self.check(&to)?;
        let mut guard = self.files.write().unwrap_or_else(PoisonError::into_inner);
        let data = guard.remove(&from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from)))?;
        guard.insert(to, data);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        self.check(&path)?;
        let size = self.files.read().unwrap_or_else(PoisonError::into_inner).get(&path).map(|d| d.len() as u64);
        let size = size.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path, size))
    }
}
