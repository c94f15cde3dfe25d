use crate::Context;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::installed::InstalledContent;
use crate::sync::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use crate::sync::event::SyncEvent;
use crate::sync::item::{InstalledResolve, process};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use nspsync_storage::BackendHandle;
use std::path::PathBuf;

/// Where things live on the device, relative to its mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOptions {
    /// Folder the device reports installed titles in.
    pub installed_dir: PathBuf,
    /// Folder the device installs new packages from.
    pub upload_dir: PathBuf,
    /// Also upload base titles the device doesn't have.
    pub upload_all: bool,
}

/// Streams [`SyncEvent`]s while uploading every local package the device
/// could use: updates and DLC for titles it has installed, newer than what
/// it has, and (with [`PushOptions::upload_all`]) base titles it lacks.
///
/// Uploads land flat in [`PushOptions::upload_dir`]; nothing on the device is
/// removed.
pub fn push<'a>(
    source: &'a BackendHandle,
    device: &'a BackendHandle,
    ctx: &'a Context,
    options: &'a PushOptions,
) -> impl Stream<Item = LibraryResult<SyncEvent>> + 'a {
    stream! {
        for await event in push_inner(source, device, ctx, options) {
            yield event.or_raise(|| LibraryErrorKind::Sync);
        }
    }
}

fn push_inner<'a>(
    source: &'a BackendHandle,
    device: &'a BackendHandle,
    ctx: &'a Context,
    options: &'a PushOptions,
) -> impl Stream<Item = SyncResult<SyncEvent>> + 'a {
    stream!({
        yield Ok(SyncEvent::Started);

        let installed = match InstalledContent::scan(&**device, &options.installed_dir, ctx.transport.timeout)
            .await
            .or_raise(|| SyncErrorKind::Index)
        {
            Ok(installed) => installed,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        yield Ok(SyncEvent::Indexed(installed.family_count()));

        let resolver = InstalledResolve {
            installed: &installed,
            upload_folder: &options.upload_dir,
            upload_all: options.upload_all,
        };
        let mut files = source.list_stream(None);
        while let Some(file) = files.next().await {
            match file.or_raise(|| SyncErrorKind::Listing) {
                Ok(file) => {
                    yield process(source, device, ctx, &resolver, file).await.map(SyncEvent::Processed);
                },
                Err(e) => {
                    yield Err(e);
                },
            }
        }

        yield Ok(SyncEvent::Complete);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Reason;
    use crate::sync::event::{Outcome, SkipReason};
    use crate::sync::item::Transport;
    use crate::transfer::Executor;
    use nspsync_storage::backend::MockBackend;
    use std::sync::Arc;
    use std::time::Duration;

    const INSTALLED: &str = "4: Installed games";
    const UPLOAD: &str = "5: SD Card install";

    fn options(upload_all: bool) -> PushOptions {
        PushOptions { installed_dir: PathBuf::from(INSTALLED), upload_dir: PathBuf::from(UPLOAD), upload_all }
    }

    async fn fixture() -> (Arc<MockBackend>, Arc<MockBackend>) {
        let local = Arc::new(MockBackend::new().with_name("library"));
        local.insert("GameA/GameA [0100AAAAAAAA0000][v0].nsp", 100).await;
        local.insert("GameA/GameA [0100AAAAAAAA0800][v131072].nsp", 20).await;
        local.insert("GameB/GameB [0100BBBBBBBB0000][v0].nsp", 100).await;
        local.insert("GameB/GameB [0100BBBBBBBB0800][v65536].nsp", 20).await;
        local.insert("GameC/GameC [0100CCCCCCCC0800][v65536].nsp", 20).await;
        local.insert("GameC/empty [0100CCCCCCCC1001][v0].nsp", 0).await;
        let device = Arc::new(MockBackend::new().with_name("device"));
        device.insert(format!("{INSTALLED}/GameA [0100AAAAAAAA0000][v0]/GameA [0100AAAAAAAA0800][v65536].nsp"), 10).await;
        device.insert(format!("{INSTALLED}/GameC [0100CCCCCCCC0800][v65536].nsp"), 20).await;
        (local, device)
    }

    async fn run(local: BackendHandle, device: BackendHandle, upload_all: bool) -> Vec<Outcome> {
        let ctx = Context {
            executor: Executor::new(None),
            transport: Transport::push(Duration::from_secs(30)),
            size_tolerance: 3000,
        };
        let options = options(upload_all);
        let mut outcomes: Vec<Outcome> = push(&local, &device, &ctx, &options)
            .filter_map(|event| async move {
                match event.unwrap() {
                    SyncEvent::Processed(outcome) => Some(outcome),
                    _ => None,
                }
            })
            .collect()
            .await;
        outcomes.sort_by(|a, b| a.source().cmp(b.source()));
        outcomes
    }

    #[tokio::test]
    async fn test_push_uploads_newer_updates_only() {
        let (local, device) = fixture().await;
        let outcomes = run(local.clone(), device.clone(), false).await;

        assert!(matches!(outcomes[0], Outcome::Skipped { reason: SkipReason::BaseTitle, .. }));
        assert_eq!(
            outcomes[1],
            Outcome::Transferred {
                source: PathBuf::from("GameA/GameA [0100AAAAAAAA0800][v131072].nsp"),
                destination: PathBuf::from(format!("{UPLOAD}/GameA [0100AAAAAAAA0800][v131072].nsp")),
                purged: Vec::new(),
                reason: Reason::Upgrade { from: 65536 },
            }
        );
        assert!(matches!(outcomes[2], Outcome::Skipped { reason: SkipReason::BaseTitle, .. }));
        assert!(matches!(outcomes[3], Outcome::Unmatched { .. }), "GameB isn't installed");
        assert!(matches!(outcomes[4], Outcome::UpToDate { reason: Reason::UpToDate, .. }));
        assert!(matches!(outcomes[5], Outcome::Skipped { reason: SkipReason::Empty, .. }));

        assert_eq!(local.paths().await.len(), 6, "pushing never removes local files");
        assert_eq!(device.paths().await.len(), 3);
    }

    #[tokio::test]
    async fn test_push_all_uploads_missing_base_titles() {
        let (local, device) = fixture().await;
        let outcomes = run(local, device.clone(), true).await;

        assert!(matches!(outcomes[0], Outcome::Skipped { reason: SkipReason::AlreadyInstalled, .. }));
        assert!(matches!(&outcomes[2], Outcome::Transferred { reason: Reason::New, .. }));
        assert!(device.contents(format!("{UPLOAD}/GameB [0100BBBBBBBB0000][v0].nsp")).await.is_some());
    }

    #[tokio::test]
    async fn test_unreadable_installed_folder_is_fatal() {
        let (local, device) = fixture().await;
        device.fail_on(INSTALLED).await;
        let ctx = Context {
            executor: Executor::new(None),
            transport: Transport::push(Duration::from_secs(30)),
            size_tolerance: 3000,
        };
        let (local, device): (BackendHandle, BackendHandle) = (local, device);
        let options = options(false);
        let events: Vec<_> = push(&local, &device, &ctx, &options).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_err());
    }
}
