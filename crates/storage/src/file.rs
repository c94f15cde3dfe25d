//! File metadata returned by storage backends.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// A file as seen by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self { path: path.into(), size }
    }

    /// Final path component, lossily converted for identity parsing.
    pub fn name(&self) -> Cow<'_, str> {
        self.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    }

    /// Folder containing this file, relative to the storage root. Files at
    /// the root have an empty parent.
    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// The immediate contents of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub files: Vec<FileInfo>,
    /// Sub-directories, relative to the storage root.
    pub dirs: Vec<PathBuf>,
}
