//! Runtime configuration, read from environment variables.
//!
//! Installation paths follow the snap layout when `SNAP` or `SNAP_DATA` are
//! set, can be pointed elsewhere with `MAAS_DATA`, and fall back to the
//! system-wide package layout otherwise.
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "/var/lib/maas";
const DEFAULT_SHARE_DIR: &str = "/usr/share/maas";
const DEFAULT_PROC_ROOT: &str = "/proc";
const DEFAULT_INTERVAL_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Name of the file holding the machine identity, relative to the data directory.
pub const IDENTITY_FILE_NAME: &str = "maas_id";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{key}` is not valid unicode")]
    NotUnicode { key: &'static str },
    #[error("environment variable `{key}` has invalid value `{value}`: {source}")]
    InvalidNumber {
        key: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("environment variable `{key}` must be greater than zero")]
    Zero { key: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Filesystem locations used by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// The `machine-resources` probe for this architecture.
    pub resources_bin: PathBuf,
    /// Base data directory; holds the identity file.
    pub data_dir: PathBuf,
    /// Whether the agent is confined (snap), in which case the probe needs `sudo`.
    pub confined: bool,
}

impl Paths {
    pub fn identity_file(&self) -> PathBuf {
        self.data_dir.join(IDENTITY_FILE_NAME)
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub paths: Paths,
    /// Root of the procfs tree scanned for DHCP clients.
    pub proc_root: PathBuf,
    /// Delay between two collection cycles.
    pub interval: Duration,
    /// Deadline for each external command.
    pub command_timeout: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let snap = lookup("SNAP").map(PathBuf::from);
        let snap_data = lookup("SNAP_DATA").map(PathBuf::from);

        let share_dir = match &snap {
            Some(prefix) => prefix.join(DEFAULT_SHARE_DIR.trim_start_matches('/')),
            None => PathBuf::from(DEFAULT_SHARE_DIR),
        };
        let data_dir = lookup("MAAS_DATA")
            .map(PathBuf::from)
            .or(snap_data)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let paths = Paths {
            resources_bin: share_dir.join("machine-resources").join(debian_arch()),
            data_dir,
            confined: snap.is_some(),
        };

        Ok(Self {
            paths,
            proc_root: lookup("MAAS_PROC_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
            interval: seconds(&lookup, "MAAS_NETINFO_INTERVAL", DEFAULT_INTERVAL_SECS)?,
            command_timeout: seconds(
                &lookup,
                "MAAS_NETINFO_COMMAND_TIMEOUT",
                DEFAULT_COMMAND_TIMEOUT_SECS,
            )?,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<OsString>,
    key: &'static str,
    default: u64,
) -> Result<Duration> {
    let Some(raw) = lookup(key) else {
        return Ok(Duration::from_secs(default));
    };
    let value = raw.into_string().map_err(|_| Error::NotUnicode { key })?;
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|source| Error::InvalidNumber {
            key,
            value: value.clone(),
            source,
        })?;
    if secs == 0 {
        return Err(Error::Zero { key });
    }
    Ok(Duration::from_secs(secs))
}

/// Debian architecture name of the running binary, as used in the probe path.
pub fn debian_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        "s390x" => "s390x",
        "riscv64" => "riscv64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), OsString::from(v)))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_snap() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(
            config.paths.resources_bin,
            PathBuf::from("/usr/share/maas/machine-resources").join(debian_arch())
        );
        assert_eq!(config.paths.data_dir, PathBuf::from("/var/lib/maas"));
        assert_eq!(
            config.paths.identity_file(),
            PathBuf::from("/var/lib/maas/maas_id")
        );
        assert!(!config.paths.confined);
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert_eq!(config.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_snap_layout() {
        let config = Config::from_lookup(lookup_from(&[
            ("SNAP", "/snap/maas/123"),
            ("SNAP_DATA", "/var/snap/maas/123"),
        ]))
        .unwrap();
        assert_eq!(
            config.paths.resources_bin,
            PathBuf::from("/snap/maas/123/usr/share/maas/machine-resources").join(debian_arch())
        );
        assert_eq!(config.paths.data_dir, PathBuf::from("/var/snap/maas/123"));
        assert!(config.paths.confined);
    }

    #[test]
    fn test_maas_data_overrides_snap_data() {
        let config = Config::from_lookup(lookup_from(&[
            ("SNAP_DATA", "/var/snap/maas/123"),
            ("MAAS_DATA", "/srv/maas"),
        ]))
        .unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/maas"));
        assert!(!config.paths.confined);
    }

    #[test]
    fn test_invalid_interval() {
        let err = Config::from_lookup(lookup_from(&[("MAAS_NETINFO_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidNumber { key: "MAAS_NETINFO_INTERVAL", .. }));

        let err =
            Config::from_lookup(lookup_from(&[("MAAS_NETINFO_COMMAND_TIMEOUT", "0")])).unwrap_err();
        assert!(matches!(err, Error::Zero { .. }));
    }
}
