mod cli;
mod error;
mod summary;

use crate::cli::{Cli, Operation, Plan};
use crate::error::{ErrorKind, Result};
use crate::summary::Summary;
use clap::Parser;
use exn::ResultExt;
use futures::StreamExt;
use futures::stream::LocalBoxStream;
use nspsync_config::Config;
use nspsync_library::Context;
use nspsync_library::error::Result as LibraryResult;
use nspsync_library::sync::{self, PushOptions, SyncEvent, Transport};
use nspsync_library::transfer::Executor;
use nspsync_storage::BackendHandle;
use nspsync_storage::backend::{LocalBackend, ReadOnlyBackend};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, registry};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup(&cli);

    match run(&cli).await {
        Ok(summary) => {
            info!(%summary, "done");
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("{e:?}");
            ExitCode::FAILURE
        },
    }
}

fn setup(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    registry().with(filter).with(layer()).init();
}

async fn run(cli: &Cli) -> Result<Summary> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let plan = cli.plan(config.device.mount.as_deref())?;
    info!(operation = ?plan.operation, origin = %plan.origin.display(), destination = %plan.destination.display(), dry_run = cli.dry_run, "starting");

    let (source_name, destination_name) = match plan.operation {
        Operation::Pull => ("device", "destination"),
        Operation::Push => ("origin", "device"),
        Operation::Sync | Operation::Compare => ("origin", "destination"),
    };
    let source = open(source_name, &plan.origin, cli.dry_run)?;
    let destination = open(destination_name, &plan.destination, cli.dry_run)?;
    let trash = match (&config.trash, cli.dry_run) {
        (Some(dir), false) => Some(open("trash", dir, false)?),
        _ => None,
    };

    let timeout = config.listing_timeout();
    let ctx = Context {
        executor: Executor::new(trash),
        transport: match plan.operation {
            Operation::Sync | Operation::Compare => Transport::local(),
            Operation::Pull => Transport::pull(timeout),
            Operation::Push => Transport::push(timeout),
        },
        size_tolerance: config.size_tolerance,
    };
    let options = PushOptions {
        installed_dir: config.device.installed.clone(),
        upload_dir: plan.upload.clone().unwrap_or_else(|| config.device.upload.clone()),
        upload_all: cli.upload_all,
    };

    let events = stream(&plan, &source, &destination, &ctx, &options);
    let summary = drain(events).await;
    if !summary.complete {
        exn::bail!(ErrorKind::Incomplete);
    }
    Ok(summary)
}

fn open(name: &str, root: &Path, dry_run: bool) -> Result<BackendHandle> {
    let backend: BackendHandle = Arc::new(LocalBackend::new(name, root).or_raise(|| ErrorKind::Storage)?);
    Ok(match dry_run {
        true => Arc::new(ReadOnlyBackend::new(backend)),
        false => backend,
    })
}

fn stream<'a>(
    plan: &Plan,
    source: &'a BackendHandle,
    destination: &'a BackendHandle,
    ctx: &'a Context,
    options: &'a PushOptions,
) -> LocalBoxStream<'a, LibraryResult<SyncEvent>> {
    match plan.operation {
        Operation::Sync | Operation::Pull => sync::synchronize(source, destination, ctx).boxed_local(),
        Operation::Compare => sync::compare(source, destination, ctx).boxed_local(),
        Operation::Push => sync::push(source, destination, ctx, options).boxed_local(),
    }
}

async fn drain(mut events: LocalBoxStream<'_, LibraryResult<SyncEvent>>) -> Summary {
    let mut summary = Summary::default();
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => summary.record(&event),
            Err(e) => {
                error!("{e:?}");
                summary.fail();
            },
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nspsync").chain(args.iter().copied())).unwrap()
    }

    fn touch(path: &Path, size: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'#'; size]).unwrap();
    }

    #[tokio::test]
    async fn test_local_run_end_to_end() {
        let origin = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let config = tempfile::tempdir().unwrap();
        let config_file = config.path().join("config.toml");
        fs::write(&config_file, "").unwrap();
        touch(&origin.path().join("Incoming/GameA [0100AAAAAAAA0800][v131072].nsp"), 20);
        touch(&library.path().join("GameA/GameA [0100AAAAAAAA0000][v0].nsp"), 100);
        touch(&library.path().join("GameA/GameA [0100AAAAAAAA0800][v65536].nsp"), 10);

        let args = [
            "--config",
            config_file.to_str().unwrap(),
            origin.path().to_str().unwrap(),
            library.path().to_str().unwrap(),
        ];
        let summary = run(&cli(&args)).await.unwrap();
        assert_eq!((summary.transferred, summary.purged, summary.failed), (1, 1, 0));
        assert!(library.path().join("GameA/GameA [0100AAAAAAAA0800][v131072].nsp").is_file());
        assert!(!library.path().join("GameA/GameA [0100AAAAAAAA0800][v65536].nsp").exists());
        assert!(library.path().join("GameA/GameA [0100AAAAAAAA0000][v0].nsp").is_file());
        assert!(!origin.path().join("Incoming/GameA [0100AAAAAAAA0800][v131072].nsp").exists());
    }

    #[tokio::test]
    async fn test_push_to_upload_folder_on_device() {
        let mount = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let config = tempfile::tempdir().unwrap();
        let config_file = config.path().join("config.toml");
        fs::write(&config_file, format!("[device]\nmount = '{}'\n", mount.path().display())).unwrap();
        touch(
            &mount.path().join("4: Installed games/GameA [0100AAAAAAAA0000][v0]/GameA [0100AAAAAAAA0800][v65536].nsp"),
            10,
        );
        fs::create_dir(mount.path().join("5: SD Card install")).unwrap();
        touch(&library.path().join("GameA/GameA [0100AAAAAAAA0800][v131072].nsp"), 20);

        let args = [
            "--config",
            config_file.to_str().unwrap(),
            "-o",
            library.path().to_str().unwrap(),
            "-d",
            "device:5: SD Card install",
        ];
        let summary = run(&cli(&args)).await.unwrap();
        assert_eq!((summary.transferred, summary.unmatched), (1, 0));
        assert!(mount.path().join("5: SD Card install/GameA [0100AAAAAAAA0800][v131072].nsp").is_file());
        assert!(!mount.path().join("5: SD Card install/5: SD Card install").exists());
        assert!(library.path().join("GameA/GameA [0100AAAAAAAA0800][v131072].nsp").is_file());
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let origin = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let config = tempfile::tempdir().unwrap();
        let config_file = config.path().join("config.toml");
        fs::write(&config_file, "").unwrap();
        touch(&origin.path().join("GameA [0100AAAAAAAA0800][v131072].nsp"), 20);
        touch(&library.path().join("GameA/GameA [0100AAAAAAAA0800][v65536].nsp"), 10);

        let args = [
            "--dry-run",
            "--config",
            config_file.to_str().unwrap(),
            origin.path().to_str().unwrap(),
            library.path().to_str().unwrap(),
        ];
        let summary = run(&cli(&args)).await.unwrap();
        assert_eq!(summary.transferred, 1);
        assert!(origin.path().join("GameA [0100AAAAAAAA0800][v131072].nsp").is_file());
        assert!(library.path().join("GameA/GameA [0100AAAAAAAA0800][v65536].nsp").is_file());
        assert!(!library.path().join("GameA/GameA [0100AAAAAAAA0800][v131072].nsp").exists());
    }
}
