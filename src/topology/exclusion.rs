use crate::collector::InterfaceKind;
use crate::environment::RuntimeEnvironment;

/// Returns true if interfaces of this kind never appear in the topology.
///
/// Loopback, IP-in-IP, generic tunnels and `unknown-*` types are always
/// dropped. `ethernet` devices are dropped inside containers, where they are
/// virtual pass-throughs rather than hardware.
///
/// # Arguments
///
/// * `kind` - Interface type as reported by the probe.
/// * `environment` - Where the agent itself runs.
pub fn is_excluded(kind: &InterfaceKind, environment: RuntimeEnvironment) -> bool {
    match kind {
        InterfaceKind::Loopback
        | InterfaceKind::Ipip
        | InterfaceKind::Tunnel
        | InterfaceKind::Unknown(_) => true,
        InterfaceKind::Ethernet => environment.is_container(),
        InterfaceKind::Physical
        | InterfaceKind::Bond
        | InterfaceKind::Bridge
        | InterfaceKind::Vlan
        | InterfaceKind::Other(_) => false,
    }
}
