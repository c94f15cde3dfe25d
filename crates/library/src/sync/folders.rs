use crate::Context;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::index::DestinationIndex;
use crate::matcher::resolve_first;
use crate::sync::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use crate::sync::event::SyncEvent;
use crate::sync::item::{FolderResolve, IndexResolve, process};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use nspsync_identity::TitleId;
use nspsync_storage::{BackendHandle, DirListing};
use nspsync_storage::listing::{Listed, list_dir_within, walk_within};
use std::path::PathBuf;
use tracing::{info, warn};

/// Streams [`SyncEvent`]s while bringing `destination` up to date with every
/// package under `source`.
///
/// Each folder at the source root is anchored to one destination folder: the
/// first of its top-level files whose identifier resolves (exact, then by
/// family) decides where the whole folder goes. Its files, recursively, then
/// follow into that folder at the same relative paths, minus any whose
/// identifier belongs to another family. Loose files at the source root are
/// matched one by one.
///
/// How bytes move is up to `ctx.transport`: local runs move and tidy the
/// source, device pulls copy and never touch the device.
pub fn synchronize<'a>(
    source: &'a BackendHandle,
    destination: &'a BackendHandle,
    ctx: &'a Context,
) -> impl Stream<Item = LibraryResult<SyncEvent>> + 'a {
    stream! {
        for await event in synchronize_inner(source, destination, ctx) {
            yield event.or_raise(|| LibraryErrorKind::Sync);
        }
    }
}

fn synchronize_inner<'a>(
    source: &'a BackendHandle,
    destination: &'a BackendHandle,
    ctx: &'a Context,
) -> impl Stream<Item = SyncResult<SyncEvent>> + 'a {
    stream!({
        yield Ok(SyncEvent::Started);
        let timeout = ctx.transport.timeout;

        let index = match DestinationIndex::build(&**destination, timeout).await.or_raise(|| SyncErrorKind::Index) {
            Ok(index) => index,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        yield Ok(SyncEvent::Indexed(index.len()));

        let root = match list_dir_within(&**source, None, timeout).await {
            Ok(Listed::Ready(root)) => root,
            Ok(Listed::TimedOut) => {
                warn!(backend = source.name(), "source root timed out, nothing to do");
                DirListing::default()
            },
            Err(e) => {
                yield Err(e.raise(SyncErrorKind::SourceUnavailable(PathBuf::new())));
                return;
            },
        };

        for dir in &root.dirs {
            let files = walk_within(&**source, Some(dir), timeout).await;
            let ids: Vec<TitleId> =
                files.iter().filter(|file| file.folder() == dir).filter_map(|file| TitleId::from_name(&file.name())).collect();
            let Some((anchor, found)) = resolve_first(&index, &ids) else {
                info!(folder = %dir.display(), "no match");
                yield Ok(SyncEvent::FolderUnmatched { source: dir.clone() });
                continue;
            };
            info!(folder = %dir.display(), destination = %found.folder.display(), kind = %found.kind, via = %anchor, "folder matched");
            yield Ok(SyncEvent::FolderMatched {
                source: dir.clone(),
                destination: found.folder.to_path_buf(),
                kind: found.kind,
            });

            let resolver = FolderResolve {
                destination,
                source_folder: dir,
                target_folder: found.folder,
                family: anchor.family(),
                timeout,
            };
            for file in files {
                yield process(source, destination, ctx, &resolver, file).await.map(SyncEvent::Processed);
            }
        }

        if !root.files.is_empty() {
            let resolver = IndexResolve { destination, index: &index, timeout };
            for file in root.files {
                yield process(source, destination, ctx, &resolver, file).await.map(SyncEvent::Processed);
            }
        }

        yield Ok(SyncEvent::Complete);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Reason;
    use crate::matcher::MatchKind;
    use crate::sync::event::{Outcome, SkipReason};
    use crate::sync::item::Transport;
    use crate::transfer::Executor;
    use futures::StreamExt;
    use nspsync_storage::backend::{LocalBackend, MockBackend};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    const BASE: &str = "GameA/GameA [0100AAAAAAAA0000][v0].nsp";
    const OLD_UPDATE: &str = "GameA/GameA [0100AAAAAAAA0800][v65536].nsp";

    fn ctx(transport: Transport) -> Context {
        Context { executor: Executor::new(None), transport, size_tolerance: 3000 }
    }

    async fn run(source: &BackendHandle, destination: &BackendHandle, ctx: &Context) -> Vec<SyncEvent> {
        synchronize(source, destination, ctx).map(|event| event.unwrap()).collect().await
    }

    fn outcomes(events: &[SyncEvent]) -> Vec<&Outcome> {
        events
            .iter()
            .filter_map(|event| match event {
                SyncEvent::Processed(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_update_replaces_older_version() {
        let source = Arc::new(MockBackend::new().with_name("origin"));
        source.insert("Incoming/GameA [0100AAAAAAAA0800][v131072].nsp", 20).await;
        let destination = Arc::new(MockBackend::new().with_name("library"));
        destination.insert(BASE, 100).await;
        destination.insert(OLD_UPDATE, 10).await;
        let (s, d): (BackendHandle, BackendHandle) = (source.clone(), destination.clone());

        let events = run(&s, &d, &ctx(Transport::local())).await;
        assert_eq!(events[0], SyncEvent::Started);
        assert_eq!(events[1], SyncEvent::Indexed(2));
        assert_eq!(
            events[2],
            SyncEvent::FolderMatched {
                source: PathBuf::from("Incoming"),
                destination: PathBuf::from("GameA"),
                kind: MatchKind::Exact,
            }
        );
        assert_eq!(
            outcomes(&events),
            vec![&Outcome::Transferred {
                source: PathBuf::from("Incoming/GameA [0100AAAAAAAA0800][v131072].nsp"),
                destination: PathBuf::from("GameA/GameA [0100AAAAAAAA0800][v131072].nsp"),
                purged: vec![PathBuf::from(OLD_UPDATE)],
                reason: Reason::Upgrade { from: 65536 },
            }]
        );
        assert_eq!(events.last(), Some(&SyncEvent::Complete));

        assert_eq!(
            destination.paths().await,
            vec![PathBuf::from(BASE), PathBuf::from("GameA/GameA [0100AAAAAAAA0800][v131072].nsp")]
        );
        assert!(source.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_folder_keeps_relative_paths_and_filters_family() {
        let source = Arc::new(MockBackend::new());
        source.insert("Drop/GameA DLC [0100AAAAAAAA1001][v0].nsp", 5).await;
        source.insert("Drop/Extras/GameA DLC [0100AAAAAAAA1002][v0].nsp", 5).await;
        source.insert("Drop/Extras/GameB [0100BBBBBBBB0000][v0].nsp", 5).await;
        let destination = Arc::new(MockBackend::new());
        destination.insert(BASE, 100).await;
        let (s, d): (BackendHandle, BackendHandle) = (source.clone(), destination.clone());

        let events = run(&s, &d, &ctx(Transport::local())).await;
        assert!(matches!(&events[2], SyncEvent::FolderMatched { kind: MatchKind::Family, .. }));
        let outcomes = outcomes(&events);
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[2], Outcome::Skipped { reason: SkipReason::ForeignFamily, .. }));
        assert!(
            destination.contents("GameA/Extras/GameA DLC [0100AAAAAAAA1002][v0].nsp").await.is_some(),
            "nested files keep their relative path"
        );
        assert_eq!(source.paths().await, vec![PathBuf::from("Drop/Extras/GameB [0100BBBBBBBB0000][v0].nsp")]);
    }

    #[tokio::test]
    async fn test_unmatched_folder_and_loose_files() {
        let source = Arc::new(MockBackend::new());
        source.insert("Mystery/GameZ [0100ZZZZZZZZ0000][v0].nsp", 5).await;
        source.insert("GameA [0100AAAAAAAA0800][v131072].nsp", 5).await;
        source.insert("GameY [0100YYYYYYYY0000][v0].nsp", 5).await;
        source.insert("notes.txt", 5).await;
        let destination = Arc::new(MockBackend::new());
        destination.insert(BASE, 100).await;
        destination.insert(OLD_UPDATE, 10).await;
        let (s, d): (BackendHandle, BackendHandle) = (source.clone(), destination.clone());

        let events = run(&s, &d, &ctx(Transport::local())).await;
        assert_eq!(events[2], SyncEvent::FolderUnmatched { source: PathBuf::from("Mystery") });
        let outcomes = outcomes(&events);
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0], Outcome::Transferred { destination, .. }
            if destination == Path::new("GameA/GameA [0100AAAAAAAA0800][v131072].nsp")));
        assert!(matches!(outcomes[1], Outcome::Unmatched { .. }));
        assert!(matches!(outcomes[2], Outcome::Skipped { reason: SkipReason::Unidentified, .. }));
        assert_eq!(source.paths().await.len(), 3);
    }

    #[tokio::test]
    async fn test_pull_copies_and_leaves_device_alone() {
        let device = Arc::new(MockBackend::new().with_name("device"));
        device.insert("GameA/GameA [0100AAAAAAAA0800][v131072].nsp", 20).await;
        device.insert("GameA/GameA [0100AAAAAAAA0000][v0].nsp", 100).await;
        let destination = Arc::new(MockBackend::new());
        destination.insert(BASE, 100).await;
        destination.insert(OLD_UPDATE, 10).await;
        let (s, d): (BackendHandle, BackendHandle) = (device.clone(), destination.clone());

        let events = run(&s, &d, &ctx(Transport::pull(Duration::from_secs(30)))).await;
        let outcomes = outcomes(&events);
        assert!(matches!(outcomes[0], Outcome::UpToDate { reason: Reason::UpToDate, tidied: false, .. }));
        assert!(matches!(outcomes[1], Outcome::Transferred { .. }));
        assert_eq!(device.paths().await.len(), 2);
        assert_eq!(destination.paths().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresponsive_source_ends_quietly() {
        let device = Arc::new(MockBackend::new().with_latency(Duration::from_secs(120)));
        device.insert("GameA/GameA [0100AAAAAAAA0800][v131072].nsp", 20).await;
        let destination = Arc::new(MockBackend::new());
        let (s, d): (BackendHandle, BackendHandle) = (device, destination.clone());
        let ctx = ctx(Transport::pull(Duration::from_secs(30)));

        let events = run(&s, &d, &ctx).await;
        assert_eq!(events, vec![SyncEvent::Started, SyncEvent::Indexed(0), SyncEvent::Complete]);
        assert!(destination.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("source");
        let source = LocalBackend::new("source", &root).unwrap();
        std::fs::remove_dir(&root).unwrap();
        std::fs::write(&root, b"not a directory").unwrap();
        let (s, d): (BackendHandle, BackendHandle) = (Arc::new(source), Arc::new(MockBackend::new()));
        let ctx = ctx(Transport::local());

        let events: Vec<_> = synchronize(&s, &d, &ctx).collect().await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1], Ok(SyncEvent::Indexed(0))));
        assert!(events[2].is_err());
    }

    #[tokio::test]
    async fn test_item_failure_does_not_stop_the_run() {
        let source = Arc::new(MockBackend::new());
        source.insert("GameA [0100AAAAAAAA0800][v131072].nsp", 5).await;
        source.insert("GameA DLC [0100AAAAAAAA1001][v0].nsp", 5).await;
        let destination = Arc::new(MockBackend::new());
        destination.insert(BASE, 100).await;
        destination.fail_on("GameA/GameA [0100AAAAAAAA0800][v131072].nsp").await;
        let (s, d): (BackendHandle, BackendHandle) = (source, destination);
        let ctx = ctx(Transport::local());

        let events: Vec<_> = synchronize(&s, &d, &ctx).collect().await;
        assert!(events.iter().any(Result::is_err));
        assert!(matches!(events.last(), Some(Ok(SyncEvent::Complete))));
    }
}
