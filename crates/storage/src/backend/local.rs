//! Local filesystem storage backend.
//!
//! Serves a directory on the local filesystem (which includes a device that
//! the OS has mounted somewhere) through `tokio::fs`.

use crate::backend::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::error::ErrorKind;
use crate::file::DirListing;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use nspsync_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("library", "/srv/games")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root directory if
    /// it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but isn't a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Blocking is fine here: it happens once, before any sync starts.
            sync_create_dir(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Validate a relative storage path and join it onto the root.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!(
                "attempting to get relative path of non-absolute path `{}`",
                absolute.display()
            )))
        }
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!(
                "path `{}` is not within root `{}`",
                absolute.display(),
                self.root.display()
            ))
        })?;
        validate_path(relative)
    }

    /// Classify one directory entry. Pulled out of the stream loop so `?`
    /// works; the loop yields whatever error comes back.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| ErrorKind::from_io(e, &path))?;
        let relative = self.relative_path(&path)?;
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(FileInfo::new(relative, metadata.len())));
        }
        // Broken symlinks and special files are not packages.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };

        // Walk from the parent of the prefix so a prefix that is a file, or
        // doesn't exist yet, isn't an error. `Path::starts_with` is
        // component-based, so "GameA" never matches "GameAB/x.nsp".
        let start_dir = validated_prefix
            .as_ref()
            .map(|prefix| self.root.join(prefix).parent().unwrap_or(&self.root).to_path_buf())
            .unwrap_or_else(|| self.root.clone());
        let mut stack = vec![start_dir];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A directory that doesn't exist lists as empty.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(err, &current)));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => {
                            yield Err(exn::Exn::from(ErrorKind::from_io(e, &current)));
                            continue 'entries;
                        },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn list_dir(&self, dir: Option<&Path>) -> Result<DirListing> {
        let absolute = match dir {
            Some(dir) => self.absolute_path(dir)?,
            None => self.root.clone(),
        };
        let mut entries = match fs::read_dir(&absolute).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(DirListing::default()),
            Err(err) => exn::bail!(ErrorKind::from_io(err, &absolute)),
        };
        let mut listing = DirListing::default();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, &absolute))? {
            let path = entry.path();
            let metadata = entry.metadata().await.map_err(|e| ErrorKind::from_io(e, &path))?;
            if metadata.is_dir() {
                listing.dirs.push(self.relative_path(&path)?);
            } else if metadata.is_file() {
                listing.files.push(FileInfo::new(self.relative_path(&path)?, metadata.len()));
            }
        }
        // read_dir order is filesystem-dependent.
        listing.files.sort_by(|a, b| a.path.cmp(&b.path));
        listing.dirs.sort();
        Ok(listing)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| ErrorKind::from_io(e, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, path))?;
        }
        let file = fs::File::create(&abs_path).await.map_err(|e| ErrorKind::from_io(e, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| ErrorKind::from_io(e, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, to))?;
        }
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| ErrorKind::from_io(e, from))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| ErrorKind::from_io(e, path))?;
        Ok(FileInfo::new(validate_path(path)?, metadata.len()))
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
