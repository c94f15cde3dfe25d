//! Directory listings with an optional deadline.
//!
//! Device mounts are known to hang on enumeration. Every listing here either
//! finishes within its deadline or reports [`Listed::TimedOut`]; a timeout is
//! never an error, the caller decides what an absent listing means.

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::file::{DirListing, FileInfo};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a listing bounded by a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listed<T> {
    Ready(T),
    TimedOut,
}
impl<T> Listed<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::TimedOut => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}
impl<T: Default> Listed<T> {
    /// A timed-out listing reads as empty.
    pub fn unwrap_or_default(self) -> T {
        self.ready().unwrap_or_default()
    }
}

/// List the immediate contents of `dir`, giving up after `timeout`.
///
/// Without a timeout this is [`StorageBackend::list_dir`]. Errors from the
/// backend are returned as-is; only the deadline maps to
/// [`Listed::TimedOut`].
pub async fn list_dir_within(
    backend: &dyn StorageBackend,
    dir: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<Listed<DirListing>> {
    let Some(timeout) = timeout else {
        return backend.list_dir(dir).await.map(Listed::Ready);
    };
    match tokio::time::timeout(timeout, backend.list_dir(dir)).await {
        Ok(listing) => listing.map(Listed::Ready),
        Err(_) => {
            warn!(
                backend = backend.name(),
                dir = %dir.unwrap_or_else(|| Path::new("")).display(),
                ?timeout,
                "directory listing timed out"
            );
            Ok(Listed::TimedOut)
        },
    }
}

/// Every file below `dir`, recursively, in listing order: a directory's
/// files come before the contents of its sub-directories.
///
/// Unreadable directories are logged and skipped so one bad folder never
/// hides its siblings. With a `timeout`, each directory gets its own deadline
/// and a directory that misses it is skipped along with everything below it.
pub async fn walk_within(backend: &dyn StorageBackend, dir: Option<&Path>, timeout: Option<Duration>) -> Vec<FileInfo> {
    let mut files = Vec::new();
    let mut pending: Vec<Option<PathBuf>> = vec![dir.map(Path::to_path_buf)];
    while let Some(current) = pending.pop() {
        match list_dir_within(backend, current.as_deref(), timeout).await {
            Ok(Listed::Ready(listing)) => {
                files.extend(listing.files);
                pending.extend(listing.dirs.into_iter().rev().map(Some));
            },
            Ok(Listed::TimedOut) => {
                debug!(dir = ?current, "skipping subtree after timeout");
            },
            Err(e) => warn!(backend = backend.name(), dir = ?current, error = ?e, "skipping unreadable directory"),
        }
    }
    files
}
