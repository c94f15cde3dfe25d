use crate::Context;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::sync::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use crate::sync::event::{Outcome, SkipReason, SyncEvent};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use nspsync_identity::{TitleId, contains_ignore_case};
use nspsync_storage::listing::{Listed, list_dir_within, walk_within};
use nspsync_storage::{BackendHandle, DirListing, FileInfo};
use std::path::PathBuf;
use tracing::{info, warn};

/// Streams [`SyncEvent`]s while checking that every package below a source
/// folder has an intact copy at the destination.
///
/// A source file's counterpart is the first destination file whose name
/// contains its identifier (files at the destination root first, then each
/// folder in turn). When their sizes differ by more than
/// `ctx.size_tolerance` bytes the destination copy is purged and the source
/// is transferred into its folder.
///
/// Loose files at the source root are not compared.
pub fn compare<'a>(
    source: &'a BackendHandle,
    destination: &'a BackendHandle,
    ctx: &'a Context,
) -> impl Stream<Item = LibraryResult<SyncEvent>> + 'a {
    stream! {
        for await event in compare_inner(source, destination, ctx) {
            yield event.or_raise(|| LibraryErrorKind::Sync);
        }
    }
}

fn compare_inner<'a>(
    source: &'a BackendHandle,
    destination: &'a BackendHandle,
    ctx: &'a Context,
) -> impl Stream<Item = SyncResult<SyncEvent>> + 'a {
    stream!({
        yield Ok(SyncEvent::Started);
        let timeout = ctx.transport.timeout;

        let existing = walk_within(&**destination, None, timeout).await;
        yield Ok(SyncEvent::Indexed(existing.len()));

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
            for file in walk_within(&**source, Some(dir), timeout).await {
                let path = file.path.clone();
                yield verify(source, destination, ctx, &existing, file)
                    .await
                    .or_raise(|| SyncErrorKind::Item(path))
                    .map(SyncEvent::Processed);
            }
        }

        yield Ok(SyncEvent::Complete);
    })
}

async fn verify(
    source: &BackendHandle,
    destination: &BackendHandle,
    ctx: &Context,
    existing: &[FileInfo],
    file: FileInfo,
) -> SyncResult<Outcome> {
    let Some(id) = TitleId::from_name(&file.name()) else {
        return Ok(Outcome::Skipped { source: file.path, reason: SkipReason::Unidentified });
    };
    let Some(counterpart) = existing.iter().find(|entry| contains_ignore_case(&entry.name(), id.as_str())) else {
        info!(path = %file.path.display(), "no match");
        return Ok(Outcome::Unmatched { source: file.path });
    };
    if file.size == 0 {
        return Ok(Outcome::Skipped { source: file.path, reason: SkipReason::Empty });
    }

    let difference = file.size.abs_diff(counterpart.size);
    if difference <= ctx.size_tolerance {
        return Ok(Outcome::Verified { source: file.path, destination: counterpart.path.clone() });
    }

    warn!(
        path = %file.path.display(),
        counterpart = %counterpart.path.display(),
        source_size = file.size,
        destination_size = counterpart.size,
        "size mismatch, replacing",
    );
    let target = counterpart.folder().join(file.name().as_ref());
    ctx.executor.purge(destination, &counterpart.path).await.or_raise(|| SyncErrorKind::Transfer)?;
    ctx.executor
        .transfer(source, &file.path, destination, &target, ctx.transport.mode)
        .await
        .or_raise(|| SyncErrorKind::Transfer)?;
    Ok(Outcome::Repaired { source: file.path, destination: target, difference })
}
