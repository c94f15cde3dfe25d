use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEVICE_PREFIX: &str = "device:";

/// Keep a game package library, and a console's SD card, on the latest
/// versions.
///
/// Packages are recognized by the `[<title id>][v<version>]` tags in their
/// names. Locations prefixed with `device:` are resolved below the
/// configured device mount: pulling from the device when it is the origin,
/// pushing to it when it is the destination.
#[derive(Debug, Parser)]
#[command(name = "nspsync", version)]
pub struct Cli {
    /// Where packages come from.
    #[arg(short, long, value_name = "LOCATION")]
    pub origin: Option<Location>,
    /// Where packages go.
    #[arg(short, long, value_name = "LOCATION")]
    pub destination: Option<Location>,
    /// Origin and destination, when not given as options.
    #[arg(value_name = "LOCATION", num_args = 0..=2)]
    pub locations: Vec<Location>,
    /// Check the destination's copies against the origin and replace broken ones.
    #[arg(short, long)]
    pub compare: bool,
    /// Also push base titles the device doesn't have yet.
    #[arg(short = 'a', long = "all")]
    pub upload_all: bool,
    /// Log what would happen without changing anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Configuration file to use instead of the default one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// More output; repeat for even more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// A directory on this machine, or one on the mounted device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    /// Relative to the device mount.
    Device(PathBuf),
}
impl FromStr for Location {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.strip_prefix(DEVICE_PREFIX) {
            Some(rest) => Self::Device(PathBuf::from(rest.trim_start_matches(['/', '\\']))),
            None => Self::Local(PathBuf::from(s)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Local directory into local directory.
    Sync,
    /// Verify and repair a local directory against another.
    Compare,
    /// Device into local directory.
    Pull,
    /// Local directory onto the device.
    Push,
}

/// A run, with both ends resolved to existing absolute directories.
///
/// A push always targets the device mount itself, so that installed content
/// is found where the device keeps it. A folder named in the `device:`
/// destination becomes the upload folder instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub operation: Operation,
    pub origin: PathBuf,
    pub destination: PathBuf,
    /// Upload folder below the mount, overriding the configured one.
    pub upload: Option<PathBuf>,
}

impl Cli {
    /// Work out what to do, and where.
    pub fn plan(&self, mount: Option<&Path>) -> Result<Plan> {
        let mut positional = self.locations.iter();
        let origin = self.origin.as_ref().or_else(|| positional.next());
        let destination = self.destination.as_ref().or_else(|| positional.next());
        let (Some(origin), Some(destination)) = (origin, destination) else {
            exn::bail!(ErrorKind::Usage("both an origin and a destination are required".to_string()));
        };
        if positional.next().is_some() {
            exn::bail!(ErrorKind::Usage("too many locations".to_string()));
        }

        let operation = match (origin, destination) {
            (Location::Device(_), Location::Device(_)) => {
                exn::bail!(ErrorKind::Usage("origin and destination can't both be on the device".to_string()));
            },
            (Location::Device(_), Location::Local(_)) | (Location::Local(_), Location::Device(_)) if self.compare => {
                exn::bail!(ErrorKind::Usage("compare only works between local directories".to_string()));
            },
            (Location::Device(_), Location::Local(_)) => Operation::Pull,
            (Location::Local(_), Location::Device(_)) => Operation::Push,
            (Location::Local(_), Location::Local(_)) if self.compare => Operation::Compare,
            (Location::Local(_), Location::Local(_)) => Operation::Sync,
        };
        let origin = resolve(origin, mount)?;
        let mut upload = None;
        let mut target = resolve(destination, mount)?;
        if let Location::Device(relative) = destination
            && !relative.as_os_str().is_empty()
        {
            upload = Some(relative.clone());
            target = resolve(&Location::Device(PathBuf::new()), mount)?;
        }
        Ok(Plan { operation, origin, destination: target, upload })
    }

    /// Log filter directive implied by `-v`.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "nspsync=info",
            1 => "nspsync=debug",
            _ => "nspsync=trace",
        }
    }
}

fn resolve(location: &Location, mount: Option<&Path>) -> Result<PathBuf> {
    let path = match location {
        Location::Local(path) => path.clone(),
        Location::Device(relative) => match mount {
            Some(mount) => mount.join(relative),
            None => {
                exn::bail!(ErrorKind::Usage("device.mount is not configured".to_string()));
            },
        },
    };
    let path = std::path::absolute(&path).unwrap_or(path);
    if !path.is_dir() {
        exn::bail!(ErrorKind::MissingDirectory(path));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nspsync").chain(args.iter().copied())).unwrap()
    }

    #[rstest]
    #[case("/srv/games", Location::Local(PathBuf::from("/srv/games")))]
    #[case("device:", Location::Device(PathBuf::new()))]
    #[case("device:/", Location::Device(PathBuf::new()))]
    #[case("device:\\4: Installed games", Location::Device(PathBuf::from("4: Installed games")))]
    #[case("games/device:", Location::Local(PathBuf::from("games/device:")))]
    fn test_location(#[case] input: &str, #[case] expected: Location) {
        assert_eq!(input.parse::<Location>().unwrap(), expected);
    }

    #[test]
    fn test_operation_follows_the_device() {
        let mount = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let local = local.path().to_str().unwrap();

        let plan = parse(&["-o", "device:", "-d", local]).plan(Some(mount.path())).unwrap();
        assert_eq!(plan.operation, Operation::Pull);
        assert_eq!(plan.origin, mount.path());

        let plan = parse(&[local, "device:"]).plan(Some(mount.path())).unwrap();
        assert_eq!(plan.operation, Operation::Push);
        assert_eq!((plan.destination.as_path(), plan.upload), (mount.path(), None));

        let plan = parse(&["-c", local, local]).plan(None).unwrap();
        assert_eq!(plan.operation, Operation::Compare);
        let plan = parse(&[local, local]).plan(None).unwrap();
        assert_eq!(plan.operation, Operation::Sync);
    }

    #[test]
    fn test_push_targets_the_mount() {
        let mount = tempfile::tempdir().unwrap();
        std::fs::create_dir(mount.path().join("5: SD Card install")).unwrap();
        let local = tempfile::tempdir().unwrap();

        let args = ["-o", local.path().to_str().unwrap(), "-d", "device:5: SD Card install"];
        let plan = parse(&args).plan(Some(mount.path())).unwrap();
        assert_eq!(plan.destination, mount.path());
        assert_eq!(plan.upload, Some(PathBuf::from("5: SD Card install")));

        let args = ["-o", local.path().to_str().unwrap(), "-d", "device:missing"];
        let err = parse(&args).plan(Some(mount.path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingDirectory(path) if path == &mount.path().join("missing")));
    }

    #[rstest]
    #[case::one_location(&["/tmp"])]
    #[case::both_on_device(&["device:", "device:"])]
    #[case::compare_with_device(&["-c", "device:", "/tmp"])]
    #[case::no_mount(&["device:", "/tmp"])]
    fn test_impossible_runs(#[case] args: &[&str]) {
        let err = parse(args).plan(None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Usage(_)));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = parse(&[dir.path().to_str().unwrap(), missing.to_str().unwrap()]).plan(None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingDirectory(path) if path == &missing));
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&[]).log_directive(), "nspsync=info");
        assert_eq!(parse(&["-vv"]).log_directive(), "nspsync=trace");
    }
}
