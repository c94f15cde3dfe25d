//! What a device already has installed.
//!
//! Devices expose installed titles in two styles: as folders named after the
//! title (`Game [0100AAAAAAAA0000][v0]`) and as package files, either inside
//! those folders or loose at the root. Both count as evidence.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nspsync_identity::{Identity, TitleId};
use nspsync_storage::listing::{Listed, list_dir_within};
use nspsync_storage::{FileInfo, StorageBackend};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct InstalledContent {
    /// Family prefixes, upper-cased.
    families: HashSet<String>,
    artifacts: HashMap<TitleId, Vec<FileInfo>>,
}

impl InstalledContent {
    /// Scan `dir` on the device: the names of its folders, the files inside
    /// each folder (one level deep) and the files at its root.
    ///
    /// A folder that can't be listed, or times out, is logged and skipped. A
    /// root that times out scans as empty; a root that errors is an error.
    pub async fn scan(backend: &dyn StorageBackend, dir: &Path, timeout: Option<Duration>) -> Result<Self> {
        let root = match list_dir_within(backend, Some(dir), timeout).await.or_raise(|| ErrorKind::Storage)? {
            Listed::Ready(listing) => listing,
            Listed::TimedOut => {
                warn!(dir = %dir.display(), "installed content timed out, assuming nothing is installed");
                return Ok(Self::default());
            },
        };

        let mut installed = Self::default();
        for folder in &root.dirs {
            installed.record(FileInfo::new(folder.clone(), 0));
            match list_dir_within(backend, Some(folder), timeout).await {
                Ok(Listed::Ready(listing)) => listing.files.into_iter().for_each(|file| installed.record(file)),
                Ok(Listed::TimedOut) => {},
                Err(e) => warn!(folder = %folder.display(), error = ?e, "skipping unreadable folder"),
            }
        }
        root.files.into_iter().for_each(|file| installed.record(file));

        info!(titles = installed.families.len(), "installed content scanned");
        Ok(installed)
    }

    /// Record one folder or file as evidence of installation.
    pub fn record(&mut self, artifact: FileInfo) {
        let Some(id) = Identity::parse(&artifact.name()).id else {
            return;
        };
        self.families.insert(id.family().to_ascii_uppercase());
        self.artifacts.entry(id).or_default().push(artifact);
    }

    /// Whether any title of the same family as `id` is installed.
    pub fn has_family(&self, id: &TitleId) -> bool {
        self.families.contains(&id.family().to_ascii_uppercase())
    }

    /// Whether this exact identifier is installed.
    pub fn contains(&self, id: &TitleId) -> bool {
        self.artifacts.contains_key(id)
    }

    /// Every artifact evidencing `id`, in discovery order.
    pub fn artifacts(&self, id: &TitleId) -> &[FileInfo] {
        self.artifacts.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Highest installed version of `id`.
    pub fn latest(&self, id: &TitleId) -> Option<u64> {
        self.artifacts(id).iter().map(|artifact| Identity::parse(&artifact.name()).version).max()
    }

    /// Number of installed families.
    pub fn family_count(&self) -> usize {
        self.families.len()
    }
}
