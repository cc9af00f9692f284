use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use ipnetwork::IpNetwork;

use super::{Error, Result};
use crate::collector::{AddressFamily, InterfaceKind};

/// How an address was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkMode {
    Static,
    Dhcp,
}

impl LinkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkMode::Static => "static",
            LinkMode::Dhcp => "dhcp",
        }
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconciled address on an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpLink {
    pub mode: LinkMode,
    pub ip: IpAddr,
    /// Most specific known prefix length, or 0 when the address is an exact host.
    pub prefix_len: u8,
    pub gateway: Option<IpAddr>,
}

impl IpLink {
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.ip)
    }

    pub fn is_host_exact(&self) -> bool {
        self.prefix_len == 0
    }

    /// The address as reported upstream: `ip/prefix`, or the bare address when host-exact.
    pub fn address(&self) -> String {
        if self.is_host_exact() {
            self.ip.to_string()
        } else {
            format!("{}/{}", self.ip, self.prefix_len)
        }
    }

    /// The subnet this link lives on; host-exact links are their own `/32` or `/128`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNetwork`] if the prefix is too long for the address family.
    pub fn network(&self) -> Result<IpNetwork> {
        let prefix = if self.is_host_exact() {
            self.family().host_prefix()
        } else {
            self.prefix_len
        };
        let invalid = |source| Error::InvalidNetwork {
            address: self.address(),
            source,
        };
        let net = IpNetwork::new(self.ip, prefix).map_err(invalid)?;
        IpNetwork::new(net.network(), prefix).map_err(invalid)
    }
}

/// VLAN tagging of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vlan {
    pub lower_device: String,
    pub vid: u16,
}

/// A normalized interface, the unit of the published topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub kind: InterfaceKind,
    pub mac_address: String,
    pub enabled: bool,
    pub links: Vec<IpLink>,
    pub vlan: Option<Vlan>,
    pub parents: Vec<String>,
    pub monitored: bool,
}

/// The complete, validated topology of one machine for one collection cycle.
///
/// Only [`TopologyBuilder`](super::TopologyBuilder) constructs it; afterwards it
/// is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    interfaces: BTreeMap<String, Interface>,
}

impl Topology {
    pub(super) fn new(interfaces: BTreeMap<String, Interface>) -> Self {
        Self { interfaces }
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Interfaces in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Interface)> {
        self.interfaces
            .iter()
            .map(|(name, iface)| (name.as_str(), iface))
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Names of the interfaces monitored by default, in name order.
    pub fn monitored(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, iface)| iface.monitored)
            .map(|(name, _)| name)
            .collect()
    }
}

impl IntoIterator for Topology {
    type Item = (String, Interface);
    type IntoIter = std::collections::btree_map::IntoIter<String, Interface>;

    fn into_iter(self) -> Self::IntoIter {
        self.interfaces.into_iter()
    }
}
