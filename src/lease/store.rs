use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::parser::latest_fixed_address;
use super::{Error, Result};
use crate::environment;
use crate::error::ResultOkLogExt;
use crate::fsutil;

/// Process name of the ISC DHCP client.
pub const DHCP_CLIENT_COMMAND: &str = "dhclient";

/// Most recent DHCP-granted address per interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseRecord(BTreeMap<String, IpAddr>);

impl LeaseRecord {
    pub fn get(&self, interface: &str) -> Option<IpAddr> {
        self.0.get(interface).copied()
    }

    pub fn insert(&mut self, interface: impl Into<String>, address: IpAddr) -> Option<IpAddr> {
        self.0.insert(interface.into(), address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IpAddr)> {
        self.0.iter().map(|(name, ip)| (name.as_str(), *ip))
    }
}

impl<S: Into<String>> FromIterator<(S, IpAddr)> for LeaseRecord {
    fn from_iter<T: IntoIterator<Item = (S, IpAddr)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A running DHCP client, as recovered from its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpClient {
    pub pid: u32,
    pub lease_file: PathBuf,
    pub interface: String,
}

/// Extracts the lease file (the argument after `-lf`) and the interface (the
/// final argument) from a NUL-separated `/proc/<pid>/cmdline`.
///
/// # Arguments
///
/// * `pid` - Process the command line belongs to; copied into the result.
/// * `cmdline` - Raw contents of `/proc/<pid>/cmdline`, NUL-separated.
///
/// # Returns
///
/// * `Some(client)` if the command line names both a lease file and an interface.
/// * `None` when the command line has no `-lf` option or no interface.
pub fn parse_cmdline(pid: u32, cmdline: &[u8]) -> Option<DhcpClient> {
    let args: Vec<String> = cmdline
        .split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect();

    let lf = args.iter().position(|arg| arg == "-lf")?;
    let lease_file = args.get(lf + 1)?;
    // The interface comes after every option, so it must follow the lease path.
    if args.len() <= lf + 2 {
        return None;
    }
    let interface = args.last()?;

    Some(DhcpClient {
        pid,
        lease_file: PathBuf::from(lease_file),
        interface: interface.clone(),
    })
}

/// Discovers DHCP leases by inspecting running DHCP client processes.
#[derive(Debug, Clone)]
pub struct LeaseStore {
    proc_root: PathBuf,
    command: String,
    exclude_container_processes: bool,
}

impl LeaseStore {
    /// Creates a store scanning `proc_root` for `dhclient` processes outside containers.
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            command: DHCP_CLIENT_COMMAND.to_owned(),
            exclude_container_processes: true,
        }
    }

    /// Whether clients running inside containers are ignored (the default).
    pub fn exclude_container_processes(mut self, exclude: bool) -> Self {
        self.exclude_container_processes = exclude;
        self
    }

    /// Scans on a blocking thread, giving up as soon as `token` is cancelled.
    ///
    /// # Errors
    ///
    /// * [`Error::Cancelled`] if `token` fires before the scan completes.
    /// * Everything [`LeaseStore::scan`] returns.
    pub async fn leases(&self, token: &CancellationToken) -> Result<LeaseRecord> {
        let store = self.clone();
        let scan = tokio::task::spawn_blocking(move || store.scan());

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            res = scan => res.map_err(Error::Task)?,
        }
    }

    /// Scans the process table and reads every client's most recent lease.
    ///
    /// Processes that vanish mid-scan, unreadable lease files and unparsable
    /// addresses are skipped; a missing lease file means "no lease".
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadProcRoot`] if the process table itself cannot be listed.
    pub fn scan(&self) -> Result<LeaseRecord> {
        let mut leases = LeaseRecord::default();

        for client in self.dhcp_clients()? {
            let Some(contents) = fsutil::read_to_string_if_exists(&client.lease_file)
                .ok_log_at(log::Level::Warn)
            else {
                continue;
            };
            let Some(contents) = contents else {
                log::debug!(
                    "No lease file `{}` for {} (pid {})",
                    client.lease_file.display(),
                    client.interface,
                    client.pid
                );
                continue;
            };
            let Some(raw) = latest_fixed_address(&contents) else {
                continue;
            };
            match raw.parse::<IpAddr>() {
                Ok(address) => {
                    if let Some(previous) = leases.insert(client.interface.clone(), address) {
                        log::debug!(
                            "Lease {address} for {} replaces {previous}",
                            client.interface
                        );
                    }
                }
                Err(_) => log::warn!(
                    "Ignoring invalid fixed address `{raw}` in `{}`",
                    client.lease_file.display()
                ),
            }
        }

        Ok(leases)
    }

    /// Lists DHCP client processes, in ascending pid order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadProcRoot`] if the process table cannot be listed.
    pub fn dhcp_clients(&self) -> Result<Vec<DhcpClient>> {
        let entries = std::fs::read_dir(&self.proc_root).map_err(|source| Error::ReadProcRoot {
            path: self.proc_root.clone(),
            source,
        })?;

        let mut pids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();

        Ok(pids
            .into_iter()
            .filter(|&pid| self.is_dhcp_client(pid))
            .filter_map(|pid| {
                let path = self.process_file(pid, "cmdline");
                let cmdline = std::fs::read(&path)
                    .map_err(|source| Error::ReadProcessFile { path, source })
                    .ok_log_at(log::Level::Debug)?;
                parse_cmdline(pid, &cmdline)
            })
            .collect())
    }

    fn is_dhcp_client(&self, pid: u32) -> bool {
        let Ok(comm) = std::fs::read_to_string(self.process_file(pid, "comm")) else {
            return false;
        };
        if comm.trim() != self.command {
            return false;
        }
        if !self.exclude_container_processes {
            return true;
        }
        match environment::is_process_in_container(&self.proc_root, pid) {
            Ok(true) => {
                log::trace!("Skipping containerized {} (pid {pid})", self.command);
                false
            }
            Ok(false) => true,
            Err(err) => {
                log::debug!("Skipping {} (pid {pid}): {err}", self.command);
                false
            }
        }
    }

    fn process_file(&self, pid: u32, name: &str) -> PathBuf {
        Path::new(&self.proc_root).join(pid.to_string()).join(name)
    }
}
