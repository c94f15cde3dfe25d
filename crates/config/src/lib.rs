//! Configuration for nspsync.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults,
//! 2. a TOML or YAML file (`--config`, or `config.toml` in the platform
//!    config directory when it exists),
//! 3. environment variables prefixed `NSPSYNC_`, with `__` separating
//!    nested keys (`NSPSYNC_DEVICE__MOUNT=/run/user/1000/gvfs/mtp`).

mod error;

pub use crate::error::{Error, ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "NSPSYNC_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds a device gets to answer one directory listing.
    pub listing_timeout: u64,
    /// Bytes two copies of a package may differ by before compare mode
    /// replaces one.
    pub size_tolerance: u64,
    /// Where purged files go. Deleted outright when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trash: Option<PathBuf>,
    pub device: DeviceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_timeout: 30,
            size_tolerance: 3000,
            trash: None,
            device: DeviceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Where the device is mounted. `device:` locations resolve below it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<PathBuf>,
    /// Folder listing installed titles, relative to the mount.
    pub installed: PathBuf,
    /// Folder new packages are uploaded into, relative to the mount.
    pub upload: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mount: None,
            installed: PathBuf::from("4: Installed games"),
            upload: PathBuf::from("5: SD Card install"),
        }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit file must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            },
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|path| path.is_file()),
        };
        debug!(file = ?file, "loading configuration");
        Self::from_figment(Self::figment(file.as_deref()))
    }

    /// The layered providers, before extraction.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| exn::Exn::from(ErrorKind::Parse(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.listing_timeout == 0 {
            exn::bail!(ErrorKind::Invalid("listing_timeout must be greater than zero".to_string()));
        }
        if self.device.installed.is_absolute() || self.device.upload.is_absolute() {
            exn::bail!(ErrorKind::Invalid("device folders must be relative to the mount".to_string()));
        }
        Ok(())
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout)
    }
}

/// `config.toml` in the platform configuration directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nspsync").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::from_figment(Config::figment(None)).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.listing_timeout(), Duration::from_secs(30));
            assert_eq!(config.device.installed, Path::new("4: Installed games"));
            Ok(())
        });
    }

    #[rstest]
    #[case::toml("nspsync.toml", "size_tolerance = 10\n[device]\nmount = \"/media/switch\"\n")]
    #[case::yaml("nspsync.yaml", "size_tolerance: 10\ndevice:\n  mount: /media/switch\n")]
    fn test_file_overrides_defaults(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::from_figment(Config::figment(Some(Path::new(name)))).unwrap();
            assert_eq!(config.size_tolerance, 10);
            assert_eq!(config.device.mount.as_deref(), Some(Path::new("/media/switch")));
            assert_eq!(config.device.upload, Path::new("5: SD Card install"));
            Ok(())
        });
    }

    #[test]
    fn test_environment_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("nspsync.toml", "listing_timeout = 5\ntrash = \"/tmp/a\"\n")?;
            jail.set_env("NSPSYNC_LISTING_TIMEOUT", "7");
            jail.set_env("NSPSYNC_DEVICE__INSTALLED", "Installed");
            let config = Config::from_figment(Config::figment(Some(Path::new("nspsync.toml")))).unwrap();
            assert_eq!(config.listing_timeout, 7);
            assert_eq!(config.trash.as_deref(), Some(Path::new("/tmp/a")));
            assert_eq!(config.device.installed, Path::new("Installed"));
            Ok(())
        });
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("NSPSYNC_LISTING_TIMEOUT", "0");
            let err = Config::from_figment(Config::figment(None)).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        Jail::expect_with(|jail| {
            jail.set_env("NSPSYNC_SIZE_TOLERANCE", "lots");
            let err = Config::from_figment(Config::figment(None)).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Parse(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(path) if path == &missing));
    }
}
