//! Moving bytes between backends.
//!
//! The [`Executor`] is the only place that writes to a destination or removes
//! anything. Purged files go to a trash directory when one is configured, so
//! a bad run can be undone by hand.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nspsync_storage::{BackendHandle, StorageBackend, validate_path};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::{debug, info, warn};

/// Buffer for stream copies; device transports like large writes.
const COPY_BUFFER: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The source file is gone afterwards.
    Move,
    /// The source file is left alone.
    Copy,
}

pub struct Executor {
    trash: Option<BackendHandle>,
}

impl Executor {
    pub fn new(trash: Option<BackendHandle>) -> Self {
        Self { trash }
    }

    /// Move or copy `from` (on `source`) to `to` (on `destination`),
    /// overwriting whatever is at `to`.
    ///
    /// Moves between two plain local directories try a single rename first
    /// and fall back to copy-then-delete (e.g. across filesystems). A failed
    /// copy removes the partial target before returning the error.
    ///
    /// When a backend that would be written to is read-only, nothing happens
    /// beyond a log line.
    pub async fn transfer(
        &self,
        source: &BackendHandle,
        from: &Path,
        destination: &BackendHandle,
        to: &Path,
        mode: Mode,
    ) -> Result<()> {
        if destination.read_only() || (mode == Mode::Move && source.read_only()) {
            info!(from = %from.display(), to = %to.display(), ?mode, "dry run, not transferring");
            return Ok(());
        }
        if mode == Mode::Move && rename_local(&**source, from, &**destination, to).await? {
            debug!(from = %from.display(), to = %to.display(), "renamed");
            return Ok(());
        }
        let bytes = copy(source, from, destination, to).await?;
        debug!(from = %from.display(), to = %to.display(), bytes, "copied");
        if mode == Mode::Move {
            source.delete(from).await.or_raise(|| ErrorKind::Storage)?;
        }
        Ok(())
    }

    /// Remove `path` from `backend`: into the trash as
    /// `{unix-timestamp}-{file name}` when there is one, otherwise for good.
    /// A name already taken in the trash gets a counter,
    /// `{unix-timestamp}-{n}-{file name}`.
    pub async fn purge(&self, backend: &BackendHandle, path: &Path) -> Result<()> {
        if backend.read_only() {
            info!(path = %path.display(), "dry run, not purging");
            return Ok(());
        }
        match &self.trash {
            Some(trash) => {
                let trashed = trash_path(&**trash, path).await?;
                self.transfer(backend, path, trash, &trashed, Mode::Move).await?;
                info!(path = %path.display(), trashed = %trashed.display(), "moved to trash");
            },
            None => {
                backend.delete(path).await.or_raise(|| ErrorKind::Storage)?;
                info!(path = %path.display(), "deleted");
            },
        }
        Ok(())
    }
}

async fn trash_path(trash: &dyn StorageBackend, path: &Path) -> Result<PathBuf> {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let timestamp = UtcDateTime::now().unix_timestamp();
    let mut candidate = PathBuf::from(format!("{timestamp}-{name}"));
    let mut counter = 0u32;
    while trash.exists(&candidate).await.or_raise(|| ErrorKind::Storage)? {
        counter += 1;
        candidate = PathBuf::from(format!("{timestamp}-{counter}-{name}"));
    }
    Ok(candidate)
}

/// Rename across two backends that are both plain local directories.
/// Returns `false` when that isn't possible and the caller should copy.
async fn rename_local(source: &dyn StorageBackend, from: &Path, destination: &dyn StorageBackend, to: &Path) -> Result<bool> {
    let (Some(source_root), Some(destination_root)) = (source.local_root(), destination.local_root()) else {
        return Ok(false);
    };
    let from = source_root.join(validate_path(from).or_raise(|| ErrorKind::Storage)?);
    let to = destination_root.join(validate_path(to).or_raise(|| ErrorKind::Storage)?);
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Transfer)?;
    }
    match tokio::fs::rename(&from, &to).await {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!(from = %from.display(), to = %to.display(), error = %e, "rename failed, copying instead");
            Ok(false)
        },
    }
}

async fn copy(source: &BackendHandle, from: &Path, destination: &BackendHandle, to: &Path) -> Result<u64> {
    let reader = source.reader(from).await.or_raise(|| ErrorKind::Storage)?;
    let writer = destination.writer(to).await.or_raise(|| ErrorKind::Storage)?;
    let copied = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
        let mut reader = reader;
        let mut writer = BufWriter::with_capacity(COPY_BUFFER, writer);
        let bytes = std::io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(bytes)
    })
    .await
    .or_raise(|| ErrorKind::Transfer)
    .and_then(|copied| copied.or_raise(|| ErrorKind::Transfer));
    if copied.is_err()
        && let Err(e) = destination.delete(to).await
    {
        warn!(path = %to.display(), error = ?e, "could not remove partial copy");
    }
    copied
}
