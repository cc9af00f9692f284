use std::net::{IpAddr, Ipv4Addr};

use super::model::{IpLink, LinkMode};
use super::subnet::SubnetIndex;
use super::{Error, Result};
use crate::collector::{AddressFamily, RawAddress, RawInterface};
use crate::lease::LeaseRecord;

/// An address split into its IP and the prefix it was reported with, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAddress {
    pub ip: IpAddr,
    pub prefix: Option<u8>,
}

impl ParsedAddress {
    /// True when no prefix was given or the prefix designates a single host.
    pub fn is_host_exact(&self) -> bool {
        self.prefix
            .is_none_or(|prefix| prefix == AddressFamily::of(&self.ip).host_prefix())
    }
}

/// Parses a raw address, taking the prefix from the netmask field when present
/// and from a `/len` suffix on the address otherwise.
///
/// Netmasks may be prefix lengths (`24`) or, for IPv4, dotted masks
/// (`255.255.255.0`).
///
/// # Errors
///
/// * [`Error::InvalidAddress`] if the address is not an IP address.
/// * [`Error::InvalidPrefix`] if the prefix is malformed, zero, or too long for the family.
pub fn parse_raw_address(interface: &str, raw: &RawAddress) -> Result<ParsedAddress> {
    let (ip_part, suffix) = match raw.address.split_once('/') {
        Some((ip, prefix)) => (ip, Some(prefix)),
        None => (raw.address.as_str(), None),
    };
    let ip: IpAddr = ip_part.trim().parse().map_err(|source| Error::InvalidAddress {
        interface: interface.to_owned(),
        address: raw.address.clone(),
        source,
    })?;

    let invalid_prefix = |prefix: &str| Error::InvalidPrefix {
        interface: interface.to_owned(),
        address: raw.address.clone(),
        prefix: prefix.to_owned(),
    };
    let family = AddressFamily::of(&ip);
    let prefix = match raw.netmask.as_deref().or(suffix).map(str::trim) {
        None => None,
        Some(mask) if mask.contains('.') && family == AddressFamily::V4 => {
            let netmask: Ipv4Addr = mask.parse().map_err(|_| invalid_prefix(mask))?;
            let len = ipnetwork::ipv4_mask_to_prefix(netmask).map_err(|_| invalid_prefix(mask))?;
            if len == 0 {
                return Err(invalid_prefix(mask));
            }
            Some(len)
        }
        Some(len) => {
            let len: u8 = len.parse().map_err(|_| invalid_prefix(len))?;
            // A zero prefix would read as host-exact on the wire.
            if len == 0 || len > family.host_prefix() {
                return Err(invalid_prefix(&len.to_string()));
            }
            Some(len)
        }
    };

    Ok(ParsedAddress { ip, prefix })
}

/// Turns an interface's raw addresses into [`IpLink`]s.
///
/// Host-exact addresses take the prefix of the most specific routed subnet
/// that contains them and stay host-exact when there is none. Addresses
/// reported with a wider prefix are kept as they are. An address is `dhcp`
/// when it is the interface's current DHCP lease, `static` otherwise.
/// Gateways are left unset.
#[derive(Debug, Clone, Copy)]
pub struct LinkReconciler<'a> {
    subnets: &'a SubnetIndex,
    leases: &'a LeaseRecord,
}

impl<'a> LinkReconciler<'a> {
    pub fn new(subnets: &'a SubnetIndex, leases: &'a LeaseRecord) -> Self {
        Self { subnets, leases }
    }

    /// Reconciles every address of `raw`, preserving their order.
    ///
    /// # Errors
    ///
    /// Fails on the first address that does not parse; see [`parse_raw_address`].
    pub fn reconcile(&self, name: &str, raw: &RawInterface) -> Result<Vec<IpLink>> {
        let lease = self.leases.get(name);
        raw.addresses
            .iter()
            .map(|address| self.reconcile_address(name, lease, address))
            .collect()
    }

    fn reconcile_address(
        &self,
        name: &str,
        lease: Option<IpAddr>,
        raw: &RawAddress,
    ) -> Result<IpLink> {
        let parsed = parse_raw_address(name, raw)?;

        let prefix_len = if parsed.is_host_exact() {
            match self.subnets.lookup(parsed.ip) {
                Some(subnet) => {
                    log::trace!("{name}: {} is in routed subnet {subnet}", parsed.ip);
                    subnet.prefix()
                }
                None => 0,
            }
        } else {
            parsed.prefix.unwrap_or(0)
        };

        let mode = if lease == Some(parsed.ip) {
            LinkMode::Dhcp
        } else {
            LinkMode::Static
        };

        Ok(IpLink {
            mode,
            ip: parsed.ip,
            prefix_len,
            gateway: None,
        })
    }
}
