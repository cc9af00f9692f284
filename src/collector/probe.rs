use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::model::{AddressFamily, MachineDescription, RawInterface, Route, RouteTable};
use super::{Error, Result};
use crate::command;
use crate::config::Config;

/// Raw interface and routing facts for one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineFacts {
    pub interfaces: BTreeMap<String, RawInterface>,
    pub routes: RouteTable,
}

/// Gathers interface and routing facts from the operating system.
///
/// All subprocess interaction of the topology engine lives here; the
/// reconciliation stages only ever see the parsed [`MachineFacts`].
#[derive(Debug, Clone)]
pub struct ResourceCollector {
    probe: PathBuf,
    elevate: bool,
    timeout: Duration,
}

impl ResourceCollector {
    /// Creates a collector running `probe`, through `sudo -n` when `elevate` is set.
    pub fn new(probe: impl Into<PathBuf>, elevate: bool, timeout: Duration) -> Self {
        Self {
            probe: probe.into(),
            elevate,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.paths.resources_bin.clone(),
            config.paths.confined,
            config.command_timeout,
        )
    }

    /// Runs the probe and both route listings concurrently.
    ///
    /// # Errors
    ///
    /// Fails as soon as any of the three commands fails or produces output
    /// that does not parse; no partial facts are returned.
    pub async fn collect(&self, token: &CancellationToken) -> Result<MachineFacts> {
        let (description, v4, v6) = tokio::try_join!(
            self.describe_machine(token),
            self.list_routes(token, AddressFamily::V4),
            self.list_routes(token, AddressFamily::V6),
        )?;

        let env = &description.environment;
        log::debug!(
            "Probe reports {} {} ({} {} {}), {} interfaces",
            env.os_name,
            env.os_version,
            env.kernel,
            env.kernel_version,
            env.kernel_architecture,
            description.networks.len()
        );

        Ok(MachineFacts {
            interfaces: description.networks,
            routes: RouteTable::new(v4, v6),
        })
    }

    async fn describe_machine(&self, token: &CancellationToken) -> Result<MachineDescription> {
        let cmd = if self.elevate {
            let mut cmd = Command::new("sudo");
            cmd.arg("-n").arg(&self.probe);
            cmd
        } else {
            Command::new(&self.probe)
        };
        let stdout = command::run_checked(token, cmd, self.timeout)
            .await
            .map_err(Error::Probe)?;
        parse_machine_description(&stdout)
    }

    async fn list_routes(
        &self,
        token: &CancellationToken,
        family: AddressFamily,
    ) -> Result<Vec<Route>> {
        let mut cmd = Command::new("ip");
        cmd.arg(match family {
            AddressFamily::V4 => "-4",
            AddressFamily::V6 => "-6",
        })
        .args(["-json", "route", "list", "scope", "global"]);
        let stdout = command::run_checked(token, cmd, self.timeout)
            .await
            .map_err(|source| Error::Routes { family, source })?;
        parse_routes(&stdout, family)
    }
}

/// Parses the probe's JSON document.
///
/// # Errors
///
/// Returns [`Error::ProbeOutput`] if the document is malformed or lacks a
/// required section.
pub fn parse_machine_description(raw: &[u8]) -> Result<MachineDescription> {
    serde_json::from_slice(raw).map_err(Error::ProbeOutput)
}

/// Parses the JSON array printed by `ip -json route list`.
///
/// `ip` prints nothing at all when a family has no routes, which is read as
/// an empty table.
///
/// # Errors
///
/// Returns [`Error::RoutesOutput`] if the output is not a route array.
pub fn parse_routes(raw: &[u8], family: AddressFamily) -> Result<Vec<Route>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(raw).map_err(|source| Error::RoutesOutput { family, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::InterfaceKind;

    const DESCRIPTION: &str = r#"{
        "api_extensions": ["resources"],
        "environment": {
            "kernel": "Linux",
            "kernel_architecture": "x86_64",
            "kernel_version": "6.8.0-31-generic",
            "os_name": "ubuntu",
            "os_version": "24.04"
        },
        "resources": {"cpu": {"total": 4}},
        "networks": {
            "eth0": {
                "type": "physical",
                "state": "up",
                "hwaddr": "52:54:00:12:34:56",
                "addresses": [{"family": "inet", "address": "10.0.0.5", "netmask": "24", "scope": "global"}]
            },
            "lo": {"type": "loopback", "state": "up", "addresses": []}
        }
    }"#;

    #[test]
    fn test_parse_machine_description() {
        let description = parse_machine_description(DESCRIPTION.as_bytes()).unwrap();
        assert_eq!(description.environment.os_version, "24.04");
        assert_eq!(description.networks.len(), 2);
        assert_eq!(description.networks["eth0"].kind, InterfaceKind::Physical);
        assert_eq!(description.networks["eth0"].hwaddr, "52:54:00:12:34:56");
    }

    #[test]
    fn test_parse_machine_description_requires_networks() {
        let err = parse_machine_description(br#"{"environment": {}, "resources": {}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::ProbeOutput(_)));
    }

    #[test]
    fn test_parse_routes() {
        let raw = br#"[
            {"dst":"default","gateway":"192.168.1.1","dev":"eth0","protocol":"dhcp","metric":100,"flags":[]},
            {"dst":"192.168.1.0/24","dev":"eth0","protocol":"kernel","scope":"link","prefsrc":"192.168.1.20","flags":[]}
        ]"#;
        let routes = parse_routes(raw, AddressFamily::V4).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].gateway, Some("192.168.1.1".parse().unwrap()));
        assert_eq!(routes[1].gateway, None);
    }

    #[test]
    fn test_parse_routes_empty_output() {
        assert!(parse_routes(b"\n", AddressFamily::V6).unwrap().is_empty());
        let err = parse_routes(b"not json", AddressFamily::V6).unwrap_err();
        assert!(matches!(
            err,
            Error::RoutesOutput {
                family: AddressFamily::V6,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_collect_fails_when_probe_fails() {
        let collector = ResourceCollector::new("false", false, Duration::from_secs(5));
        let err = collector
            .describe_machine(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }

    #[tokio::test]
    async fn test_collect_rejects_malformed_probe_output() {
        let collector = ResourceCollector::new("true", false, Duration::from_secs(5));
        let err = collector
            .describe_machine(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProbeOutput(_)));
    }
}
