//! Raw facts as reported by `machine-resources` and `ip -json route`.
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer};

/// Address family of an IP address or route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Prefix length that designates a single host (`/32` or `/128`).
    pub fn host_prefix(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("inet"),
            AddressFamily::V6 => f.write_str("inet6"),
        }
    }
}

/// Administrative interface type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum InterfaceKind {
    Physical,
    Ethernet,
    Bond,
    Bridge,
    Vlan,
    Loopback,
    Ipip,
    Tunnel,
    /// Any `unknown-*` type; holds the full type string.
    Unknown(String),
    /// Any other type; holds the type string verbatim.
    Other(String),
}

impl InterfaceKind {
    pub fn as_str(&self) -> &str {
        match self {
            InterfaceKind::Physical => "physical",
            InterfaceKind::Ethernet => "ethernet",
            InterfaceKind::Bond => "bond",
            InterfaceKind::Bridge => "bridge",
            InterfaceKind::Vlan => "vlan",
            InterfaceKind::Loopback => "loopback",
            InterfaceKind::Ipip => "ipip",
            InterfaceKind::Tunnel => "tunnel",
            InterfaceKind::Unknown(kind) | InterfaceKind::Other(kind) => kind,
        }
    }
}

impl From<String> for InterfaceKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "physical" => InterfaceKind::Physical,
            "ethernet" => InterfaceKind::Ethernet,
            "bond" => InterfaceKind::Bond,
            "bridge" => InterfaceKind::Bridge,
            "vlan" => InterfaceKind::Vlan,
            "loopback" => InterfaceKind::Loopback,
            "ipip" => InterfaceKind::Ipip,
            "tunnel" => InterfaceKind::Tunnel,
            _ if kind.starts_with("unknown-") => InterfaceKind::Unknown(kind),
            _ => InterfaceKind::Other(kind),
        }
    }
}

impl From<&str> for InterfaceKind {
    fn from(kind: &str) -> Self {
        InterfaceKind::from(kind.to_owned())
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational state of an interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Up,
    #[default]
    #[serde(other)]
    Down,
}

/// One address as reported by the probe, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawAddress {
    pub address: String,
    #[serde(default, deserialize_with = "deserialize_netmask")]
    pub netmask: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BondInfo {
    #[serde(default)]
    pub lower_devices: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BridgeInfo {
    #[serde(default)]
    pub upper_devices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VlanInfo {
    pub lower_device: String,
    pub vid: u16,
}

/// An interface as reported by the probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawInterface {
    #[serde(rename = "type")]
    pub kind: InterfaceKind,
    #[serde(default)]
    pub hwaddr: String,
    #[serde(default)]
    pub state: LinkState,
    #[serde(default)]
    pub addresses: Vec<RawAddress>,
    #[serde(default)]
    pub bond: Option<BondInfo>,
    #[serde(default)]
    pub bridge: Option<BridgeInfo>,
    #[serde(default)]
    pub vlan: Option<VlanInfo>,
}

impl RawInterface {
    pub fn is_up(&self) -> bool {
        self.state == LinkState::Up
    }

    /// Names of the interfaces this one is stacked on, in declaration order.
    pub fn declared_parents(&self) -> Vec<String> {
        match &self.kind {
            InterfaceKind::Bond => self
                .bond
                .as_ref()
                .map(|bond| bond.lower_devices.clone())
                .unwrap_or_default(),
            InterfaceKind::Bridge => self
                .bridge
                .as_ref()
                .map(|bridge| bridge.upper_devices.clone())
                .unwrap_or_default(),
            InterfaceKind::Vlan => self
                .vlan
                .as_ref()
                .map(|vlan| vec![vlan.lower_device.clone()])
                .unwrap_or_default(),
            InterfaceKind::Physical
            | InterfaceKind::Ethernet
            | InterfaceKind::Loopback
            | InterfaceKind::Ipip
            | InterfaceKind::Tunnel
            | InterfaceKind::Unknown(_)
            | InterfaceKind::Other(_) => Vec::new(),
        }
    }
}

/// Kernel and OS metadata from the probe's `environment` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProbeEnvironment {
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub kernel_version: String,
    #[serde(default)]
    pub kernel_architecture: String,
    #[serde(default)]
    pub os_name: String,
    #[serde(default)]
    pub os_version: String,
}

/// The probe's JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineDescription {
    pub environment: ProbeEnvironment,
    pub resources: serde_json::Value,
    pub networks: BTreeMap<String, RawInterface>,
}

/// One route from `ip -json route list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Route {
    pub dst: String,
    #[serde(default)]
    pub gateway: Option<IpAddr>,
    #[serde(default)]
    pub dev: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub metric: Option<u32>,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Global-scope routes, keyed by destination within each address family.
///
/// When several routes share a destination, the one with the lowest metric
/// is kept (earliest wins on a tie).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    v4: BTreeMap<String, Route>,
    v6: BTreeMap<String, Route>,
}

impl RouteTable {
    pub fn new(v4: Vec<Route>, v6: Vec<Route>) -> Self {
        Self {
            v4: Self::key_by_destination(v4),
            v6: Self::key_by_destination(v6),
        }
    }

    fn key_by_destination(routes: Vec<Route>) -> BTreeMap<String, Route> {
        let mut by_dst: BTreeMap<String, Route> = BTreeMap::new();
        for route in routes {
            let shadowed = by_dst.get(&route.dst).is_some_and(|existing| {
                existing.metric.unwrap_or(0) <= route.metric.unwrap_or(0)
            });
            if shadowed {
                log::trace!("Ignoring duplicate route to {} via {:?}", route.dst, route.dev);
            } else {
                by_dst.insert(route.dst.clone(), route);
            }
        }
        by_dst
    }

    pub fn routes(&self, family: AddressFamily) -> &BTreeMap<String, Route> {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }

    pub fn get(&self, family: AddressFamily, dst: &str) -> Option<&Route> {
        self.routes(family).get(dst)
    }

    pub fn default_route(&self, family: AddressFamily) -> Option<&Route> {
        self.get(family, "default")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Netmask {
    Number(u64),
    Text(String),
}

fn deserialize_netmask<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<Netmask>::deserialize(deserializer)?.map(|netmask| match netmask {
            Netmask::Number(len) => len.to_string(),
            Netmask::Text(text) => text,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_kind_from_string() {
        assert_eq!(InterfaceKind::from("bond"), InterfaceKind::Bond);
        assert_eq!(
            InterfaceKind::from("unknown-1234"),
            InterfaceKind::Unknown("unknown-1234".to_owned())
        );
        assert_eq!(
            InterfaceKind::from("wireless"),
            InterfaceKind::Other("wireless".to_owned())
        );
        assert_eq!(InterfaceKind::from("unknown-x").as_str(), "unknown-x");
    }

    #[test]
    fn test_raw_interface_netmask_accepts_number_or_string() {
        let raw: RawInterface = serde_json::from_value(serde_json::json!({
            "type": "physical",
            "state": "up",
            "hwaddr": "00:11:22:33:44:55",
            "addresses": [
                {"address": "10.0.0.5", "netmask": "24"},
                {"address": "10.0.1.5", "netmask": 16},
                {"address": "fe80::1"}
            ]
        }))
        .unwrap();

        assert!(raw.is_up());
        assert_eq!(raw.addresses[0].netmask.as_deref(), Some("24"));
        assert_eq!(raw.addresses[1].netmask.as_deref(), Some("16"));
        assert_eq!(raw.addresses[2].netmask, None);
    }

    #[test]
    fn test_unknown_state_is_down() {
        let raw: RawInterface =
            serde_json::from_value(serde_json::json!({"type": "physical", "state": "dormant"}))
                .unwrap();
        assert!(!raw.is_up());
    }

    #[test]
    fn test_declared_parents_follow_kind() {
        let bond: RawInterface = serde_json::from_value(serde_json::json!({
            "type": "bond",
            "bond": {"lower_devices": ["eth0", "eth1"]},
            "vlan": {"lower_device": "ignored", "vid": 3}
        }))
        .unwrap();
        assert_eq!(bond.declared_parents(), vec!["eth0", "eth1"]);

        let vlan: RawInterface = serde_json::from_value(serde_json::json!({
            "type": "vlan",
            "vlan": {"lower_device": "bond0", "vid": 42}
        }))
        .unwrap();
        assert_eq!(vlan.declared_parents(), vec!["bond0"]);

        let physical: RawInterface =
            serde_json::from_value(serde_json::json!({"type": "physical"})).unwrap();
        assert!(physical.declared_parents().is_empty());
    }

    #[test]
    fn test_route_table_keeps_lowest_metric() {
        let routes: Vec<Route> = serde_json::from_str(
            r#"[
                {"dst": "default", "gateway": "10.0.0.1", "dev": "eth0", "metric": 600},
                {"dst": "default", "gateway": "10.0.0.254", "dev": "eth1", "metric": 100},
                {"dst": "10.0.0.0/24", "dev": "eth0", "protocol": "kernel", "flags": []}
            ]"#,
        )
        .unwrap();
        let table = RouteTable::new(routes, Vec::new());

        let default = table.default_route(AddressFamily::V4).unwrap();
        assert_eq!(default.gateway, Some("10.0.0.254".parse().unwrap()));
        assert!(table.get(AddressFamily::V4, "10.0.0.0/24").is_some());
        assert!(table.default_route(AddressFamily::V6).is_none());
    }
}
