//! The per-file loop shared by every orchestrator.
//!
//! Each orchestrator differs only in how it finds the place a file should go
//! (a [`Resolve`] implementation) and in how bytes move (a [`Transport`]).

use crate::Context;
use crate::decision::decide;
use crate::index::DestinationIndex;
use crate::installed::InstalledContent;
use crate::matcher::resolve_folder;
use crate::sync::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use crate::sync::event::{Outcome, SkipReason};
use crate::transfer::Mode;
use async_trait::async_trait;
use exn::ResultExt;
use nspsync_identity::Identity;
use nspsync_storage::listing::list_dir_within;
use nspsync_storage::{BackendHandle, FileInfo};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// How bytes move in a given direction, and what gets cleaned up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    pub mode: Mode,
    /// Never copy a package whose version the destination already has.
    pub skip_size_tie: bool,
    /// Remove source files the destination already satisfies.
    pub tidy_source: bool,
    /// Purge older versions at the destination before transferring.
    pub purge_stale: bool,
    /// Deadline for each directory listing.
    pub timeout: Option<Duration>,
}
impl Transport {
    /// Local directory to local directory: move, tidy, purge.
    pub fn local() -> Self {
        Self {
            mode: Mode::Move,
            skip_size_tie: false,
            tidy_source: true,
            purge_stale: true,
            timeout: None,
        }
    }

    /// Device to local directory: copy, never touch the device.
    pub fn pull(timeout: Duration) -> Self {
        Self {
            mode: Mode::Copy,
            skip_size_tie: true,
            tidy_source: false,
            purge_stale: true,
            timeout: Some(timeout),
        }
    }

    /// Local directory to device: copy into the upload folder, and leave the
    /// device's installed content to the device.
    pub fn push(timeout: Duration) -> Self {
        Self {
            mode: Mode::Copy,
            skip_size_tie: true,
            tidy_source: false,
            purge_stale: false,
            timeout: Some(timeout),
        }
    }
}

/// Where a file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Transfer to `target` (relative to the destination root), judged
    /// against `existing`.
    Target { target: PathBuf, existing: Vec<FileInfo> },
    Unmatched,
    Skip(SkipReason),
}

#[async_trait]
pub trait Resolve: Send + Sync {
    /// Family every file handled by this resolver must belong to.
    fn expected_family(&self) -> Option<&str> {
        None
    }

    async fn place(&self, file: &FileInfo, identity: &Identity) -> SyncResult<Placement>;
}

/// Files of an anchored source folder go to the same relative path below the
/// matched destination folder.
pub struct FolderResolve<'a> {
    pub destination: &'a BackendHandle,
    pub source_folder: &'a Path,
    pub target_folder: &'a Path,
    pub family: &'a str,
    pub timeout: Option<Duration>,
}

#[async_trait]
impl Resolve for FolderResolve<'_> {
    fn expected_family(&self) -> Option<&str> {
        Some(self.family)
    }

    async fn place(&self, file: &FileInfo, _identity: &Identity) -> SyncResult<Placement> {
        let relative = match file.path.strip_prefix(self.source_folder) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => PathBuf::from(file.name().as_ref()),
        };
        let target = self.target_folder.join(relative);
        let existing = list_target_folder(self.destination, &target, self.timeout).await?;
        Ok(Placement::Target { target, existing })
    }
}

/// Loose files are matched one at a time against the destination index.
pub struct IndexResolve<'a> {
    pub destination: &'a BackendHandle,
    pub index: &'a DestinationIndex,
    pub timeout: Option<Duration>,
}

#[async_trait]
impl Resolve for IndexResolve<'_> {
    async fn place(&self, file: &FileInfo, identity: &Identity) -> SyncResult<Placement> {
        let Some(id) = &identity.id else {
            return Ok(Placement::Skip(SkipReason::Unidentified));
        };
        let Some(found) = resolve_folder(self.index, id) else {
            return Ok(Placement::Unmatched);
        };
        debug!(id = %id, folder = %found.folder.display(), kind = %found.kind, "matched loose file");
        let target = found.folder.join(file.name().as_ref());
        let existing = list_target_folder(self.destination, &target, self.timeout).await?;
        Ok(Placement::Target { target, existing })
    }
}

/// Uploads land flat in the device's upload folder, judged against what the
/// device reports as installed.
pub struct InstalledResolve<'a> {
    pub installed: &'a InstalledContent,
    pub upload_folder: &'a Path,
    pub upload_all: bool,
}

#[async_trait]
impl Resolve for InstalledResolve<'_> {
    async fn place(&self, file: &FileInfo, identity: &Identity) -> SyncResult<Placement> {
        let Some(id) = &identity.id else {
            return Ok(Placement::Skip(SkipReason::Unidentified));
        };
        let target = self.upload_folder.join(file.name().as_ref());
        debug!(id = %id, kind = %id.kind(), installed = ?self.installed.latest(id), "checking installed content");
        if id.is_base() {
            return Ok(match (self.upload_all, self.installed.contains(id)) {
                (false, _) => Placement::Skip(SkipReason::BaseTitle),
                (true, true) => Placement::Skip(SkipReason::AlreadyInstalled),
                (true, false) => Placement::Target { target, existing: Vec::new() },
            });
        }
        if !self.installed.has_family(id) {
            return Ok(Placement::Unmatched);
        }
        Ok(Placement::Target { target, existing: self.installed.artifacts(id).to_vec() })
    }
}

/// Files in the folder `target` would land in. A timed-out listing reads as
/// an empty folder.
async fn list_target_folder(
    destination: &BackendHandle,
    target: &Path,
    timeout: Option<Duration>,
) -> SyncResult<Vec<FileInfo>> {
    let folder = target.parent().filter(|p| !p.as_os_str().is_empty());
    let listed = list_dir_within(&**destination, folder, timeout).await.or_raise(|| SyncErrorKind::Listing)?;
    Ok(listed.unwrap_or_default().files)
}

/// Run one source file through filter, resolve, decide and execute.
pub(crate) async fn process(
    source: &BackendHandle,
    destination: &BackendHandle,
    ctx: &Context,
    resolver: &dyn Resolve,
    file: FileInfo,
) -> SyncResult<Outcome> {
    let path = file.path.clone();
    process_inner(source, destination, ctx, resolver, file).await.or_raise(|| SyncErrorKind::Item(path))
}

async fn process_inner(
    source: &BackendHandle,
    destination: &BackendHandle,
    ctx: &Context,
    resolver: &dyn Resolve,
    file: FileInfo,
) -> SyncResult<Outcome> {
    let identity = Identity::parse(&file.name());
    if let Some(id) = &identity.id {
        debug!(path = %file.path.display(), id = %id, kind = %id.kind(), version = identity.version, "processing");
    }
    if let Some(family) = resolver.expected_family()
        && !identity.in_family(family)
    {
        info!(path = %file.path.display(), family, "skipping, identifier prefix mismatch");
        return Ok(Outcome::Skipped { source: file.path, reason: SkipReason::ForeignFamily });
    }
    if file.size == 0 {
        debug!(path = %file.path.display(), "skipping empty file");
        return Ok(Outcome::Skipped { source: file.path, reason: SkipReason::Empty });
    }

    let (target, existing) = match resolver.place(&file, &identity).await? {
        Placement::Target { target, existing } => (target, existing),
        Placement::Unmatched => {
            info!(path = %file.path.display(), "no match");
            return Ok(Outcome::Unmatched { source: file.path });
        },
        Placement::Skip(reason) => {
            debug!(path = %file.path.display(), %reason, "skipping");
            return Ok(Outcome::Skipped { source: file.path, reason });
        },
    };

    let transport = &ctx.transport;
    let decision = decide(&file, &target, &existing, transport.skip_size_tie);
    if !decision.is_copy() {
        let tidied = transport.tidy_source && identity.id.is_some();
        if tidied {
            ctx.executor.purge(source, &file.path).await.or_raise(|| SyncErrorKind::Transfer)?;
            info!(path = %file.path.display(), reason = %decision.reason, "removed, already at destination");
        }
        return Ok(Outcome::UpToDate { source: file.path, reason: decision.reason, tidied });
    }

    let mut purged = Vec::new();
    if transport.purge_stale {
        for stale in &decision.stale {
            ctx.executor.purge(destination, &stale.path).await.or_raise(|| SyncErrorKind::Transfer)?;
            purged.push(stale.path.clone());
        }
    }
    if existing.iter().any(|entry| entry.path == target) {
        ctx.executor.purge(destination, &target).await.or_raise(|| SyncErrorKind::Transfer)?;
    }
    ctx.executor
        .transfer(source, &file.path, destination, &target, transport.mode)
        .await
        .or_raise(|| SyncErrorKind::Transfer)?;
    info!(from = %file.path.display(), to = %target.display(), reason = %decision.reason, "transferred");
    Ok(Outcome::Transferred { source: file.path, destination: target, purged, reason: decision.reason })
}
