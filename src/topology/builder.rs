use std::collections::BTreeMap;

use super::model::{Interface, Topology};
use super::{Error, Result};
use crate::collector::InterfaceKind;

/// Assembles interfaces into a validated [`Topology`].
///
/// Building checks that every declared parent exists in the same snapshot and
/// computes the default monitoring flag of each interface:
///
/// - `physical`: monitored unless it is enslaved to a bond.
/// - `bond`: always monitored.
/// - `bridge`: monitored only when it has no parents itself.
/// - anything else: not monitored.
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    interfaces: BTreeMap<String, Interface>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interface, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, interface: Interface) -> &mut Self {
        self.interfaces.insert(name.into(), interface);
        self
    }

    /// Validates parent references and computes monitoring defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingParent`] for the first (in name order)
    /// interface that names a parent missing from the snapshot.
    pub fn build(mut self) -> Result<Topology> {
        for (name, iface) in &self.interfaces {
            if let Some(parent) = iface
                .parents
                .iter()
                .find(|parent| !self.interfaces.contains_key(parent.as_str()))
            {
                return Err(Error::DanglingParent {
                    interface: name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        let monitored: Vec<(String, bool)> = {
            let children = children_index(&self.interfaces);
            self.interfaces
                .iter()
                .map(|(name, iface)| {
                    let monitored = is_monitored_by_default(
                        iface,
                        children.get(name.as_str()).map_or(&[][..], Vec::as_slice),
                        &self.interfaces,
                    );
                    (name.clone(), monitored)
                })
                .collect()
        };
        for (name, flag) in monitored {
            if let Some(iface) = self.interfaces.get_mut(&name) {
                iface.monitored = flag;
            }
        }

        Ok(Topology::new(self.interfaces))
    }
}

/// Maps each interface name to the interfaces that declare it as a parent.
pub fn children_index(interfaces: &BTreeMap<String, Interface>) -> BTreeMap<&str, Vec<&str>> {
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, iface) in interfaces {
        for parent in &iface.parents {
            children
                .entry(parent.as_str())
                .or_default()
                .push(name.as_str());
        }
    }
    children
}

fn is_monitored_by_default(
    iface: &Interface,
    children: &[&str],
    interfaces: &BTreeMap<String, Interface>,
) -> bool {
    match iface.kind {
        InterfaceKind::Physical => !children.iter().any(|child| {
            interfaces
                .get(*child)
                .is_some_and(|child| child.kind == InterfaceKind::Bond)
        }),
        InterfaceKind::Bond => true,
        InterfaceKind::Bridge => iface.parents.is_empty(),
        InterfaceKind::Ethernet
        | InterfaceKind::Vlan
        | InterfaceKind::Loopback
        | InterfaceKind::Ipip
        | InterfaceKind::Tunnel
        | InterfaceKind::Unknown(_)
        | InterfaceKind::Other(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::model::Vlan;

    fn iface(kind: &str, parents: &[&str]) -> Interface {
        Interface {
            kind: InterfaceKind::from(kind),
            mac_address: String::new(),
            enabled: true,
            links: Vec::new(),
            vlan: None,
            parents: parents.iter().map(|p| (*p).to_owned()).collect(),
            monitored: false,
        }
    }

    #[test]
    fn test_bond_members_are_not_monitored() {
        let mut builder = TopologyBuilder::new();
        builder
            .insert("eth0", iface("physical", &[]))
            .insert("eth1", iface("physical", &[]))
            .insert("eth2", iface("physical", &[]))
            .insert("bond0", iface("bond", &["eth0", "eth1"]));
        let topology = builder.build().unwrap();

        assert_eq!(topology.monitored(), vec!["bond0", "eth2"]);
    }

    #[test]
    fn test_bridges_without_parents_are_monitored() {
        let mut builder = TopologyBuilder::new();
        builder
            .insert("eth0", iface("physical", &[]))
            .insert("br0", iface("bridge", &[]))
            .insert("br1", iface("bridge", &["eth0"]));
        let topology = builder.build().unwrap();

        assert!(topology.get("br0").unwrap().monitored);
        assert!(!topology.get("br1").unwrap().monitored);
        // A bridge port is not a bond member.
        assert!(topology.get("eth0").unwrap().monitored);
    }

    #[test]
    fn test_vlans_and_other_types_are_not_monitored() {
        let mut builder = TopologyBuilder::new();
        let mut vlan = iface("vlan", &["bond0"]);
        vlan.vlan = Some(Vlan {
            lower_device: "bond0".to_owned(),
            vid: 10,
        });
        builder
            .insert("eth0", iface("physical", &[]))
            .insert("bond0", iface("bond", &["eth0"]))
            .insert("bond0.10", vlan)
            .insert("wlan0", iface("wireless", &[]))
            .insert("veth0", iface("ethernet", &[]));
        let topology = builder.build().unwrap();

        assert_eq!(topology.monitored(), vec!["bond0"]);
    }

    #[test]
    fn test_dangling_parent_is_reported() {
        let mut builder = TopologyBuilder::new();
        builder.insert("bond0", iface("bond", &["eth0", "eth9"]));
        builder.insert("eth0", iface("physical", &[]));

        match builder.build().unwrap_err() {
            Error::DanglingParent { interface, parent } => {
                assert_eq!(interface, "bond0");
                assert_eq!(parent, "eth9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_children_index() {
        let mut interfaces = BTreeMap::new();
        interfaces.insert("eth0".to_owned(), iface("physical", &[]));
        interfaces.insert("bond0".to_owned(), iface("bond", &["eth0"]));
        interfaces.insert("bond0.5".to_owned(), iface("vlan", &["bond0"]));
        interfaces.insert("br0".to_owned(), iface("bridge", &["bond0"]));

        let children = children_index(&interfaces);
        assert_eq!(children["eth0"], vec!["bond0"]);
        assert_eq!(children["bond0"], vec!["bond0.5", "br0"]);
        assert!(!children.contains_key("br0"));
    }
}
