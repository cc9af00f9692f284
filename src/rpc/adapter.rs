use prost::Message;

use super::messages::{InterfaceMessage, LinkMessage, UpdateInterfaces};
use crate::topology::{Interface, IpLink, Topology};

/// Maps a finished [`Topology`] onto the outbound wire messages.
///
/// The mapping is pure: interfaces appear in name order and links in the
/// order they were reconciled, so equal topologies give equal bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcAdapter;

impl RpcAdapter {
    pub fn to_message(topology: Topology, system_id: Option<&str>) -> UpdateInterfaces {
        UpdateInterfaces {
            system_id: system_id.unwrap_or_default().to_owned(),
            interfaces: topology
                .into_iter()
                .map(|(name, iface)| interface_message(name, iface))
                .collect(),
        }
    }

    pub fn encode(message: &UpdateInterfaces) -> Vec<u8> {
        message.encode_to_vec()
    }
}

fn interface_message(name: String, iface: Interface) -> InterfaceMessage {
    InterfaceMessage {
        name,
        mac_address: iface.mac_address,
        kind: iface.kind.to_string(),
        enabled: iface.enabled,
        monitored: iface.monitored,
        vid: iface.vlan.map(|vlan| u32::from(vlan.vid)),
        parents: iface.parents,
        links: iface.links.iter().map(link_message).collect(),
    }
}

fn link_message(link: &IpLink) -> LinkMessage {
    LinkMessage {
        mode: link.mode.to_string(),
        address: link.address(),
        gateway: link.gateway.map(|gateway| gateway.to_string()),
        prefix_len: u32::from(link.prefix_len),
    }
}
