//! Destination index: where does each title already live?
//!
//! Built once per run from a full scan of the destination and never updated
//! afterwards, so a run does not observe its own transfers.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use indexmap::IndexMap;
use nspsync_identity::TitleId;
use nspsync_storage::StorageBackend;
use nspsync_storage::listing::{Listed, list_dir_within, walk_within};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Map from title identifier to the destination folder holding it, in
/// discovery order.
#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    entries: IndexMap<TitleId, PathBuf>,
}

impl DestinationIndex {
    /// Scan every immediate subfolder of the destination root, recursively.
    ///
    /// Files directly at the root are ignored. Subtrees that can't be listed
    /// are logged and left out; only a failure to list the root itself is an
    /// error. A root that times out indexes as empty.
    pub async fn build(backend: &dyn StorageBackend, timeout: Option<Duration>) -> Result<Self> {
        let root = match list_dir_within(backend, None, timeout).await.or_raise(|| ErrorKind::Storage)? {
            Listed::Ready(listing) => listing,
            Listed::TimedOut => {
                warn!(backend = backend.name(), "destination root timed out, index is empty");
                return Ok(Self::default());
            },
        };
        let mut paths = Vec::new();
        for dir in &root.dirs {
            let files = walk_within(backend, Some(dir), timeout).await;
            paths.extend(files.into_iter().map(|file| file.path));
        }
        let index = Self::from_paths(paths);
        debug!(backend = backend.name(), titles = index.len(), "destination indexed");
        Ok(index)
    }

    /// Index an explicit list of root-relative file paths.
    ///
    /// The first path seen for an identifier wins. Paths without a parent
    /// folder (root files) and names without an identifier are ignored.
    pub fn from_paths(paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Self {
        let mut entries = IndexMap::new();
        for path in paths {
            let path = path.as_ref();
            let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
                continue;
            };
            let Some(id) = path.file_name().and_then(|name| TitleId::from_name(&name.to_string_lossy())) else {
                continue;
            };
            entries.entry(id).or_insert_with(|| parent.to_path_buf());
        }
        Self { entries }
    }

    pub fn get(&self, id: &TitleId) -> Option<&Path> {
        self.entries.get(id).map(PathBuf::as_path)
    }

    /// Like [`get`](Self::get), but also returns the identifier as indexed.
    pub fn get_entry(&self, id: &TitleId) -> Option<(&TitleId, &Path)> {
        self.entries.get_key_value(id).map(|(indexed, folder)| (indexed, folder.as_path()))
    }

    /// Entries in the order they were discovered.
    pub fn iter(&self) -> impl Iterator<Item = (&TitleId, &Path)> {
        self.entries.iter().map(|(id, folder)| (id, folder.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
