use std::collections::BTreeSet;

use super::Result;
use super::builder::TopologyBuilder;
use super::exclusion::is_excluded;
use super::gateway::GatewayResolver;
use super::links::LinkReconciler;
use super::model::{Interface, Topology, Vlan};
use super::subnet::SubnetIndex;
use crate::collector::{InterfaceKind, MachineFacts};
use crate::environment::RuntimeEnvironment;
use crate::lease::LeaseRecord;

/// Turns one cycle's raw facts into a validated [`Topology`].
///
/// Excluded interfaces are dropped first, along with every reference to them
/// as a parent. Then every remaining interface's addresses are reconciled
/// against the routed subnets and leases, gateways are attached, and the
/// topology is assembled. Any malformed address or route aborts the whole
/// pass, as does a parent the probe never reported.
///
/// # Arguments
///
/// * `facts` - Interfaces and routes collected this cycle.
/// * `leases` - Current DHCP lease per interface; decides `dhcp` vs `static`.
/// * `environment` - Where the agent runs; changes which interfaces are excluded.
///
/// # Errors
///
/// Returns the first [`Error`](super::Error) met in any stage.
pub fn build_topology(
    facts: &MachineFacts,
    leases: &LeaseRecord,
    environment: RuntimeEnvironment,
) -> Result<Topology> {
    let subnets = SubnetIndex::from_routes(&facts.routes)?;
    let reconciler = LinkReconciler::new(&subnets, leases);
    let gateways = GatewayResolver::new(&facts.routes);

    let excluded: BTreeSet<&str> = facts
        .interfaces
        .iter()
        .filter(|(_, raw)| is_excluded(&raw.kind, environment))
        .map(|(name, raw)| {
            log::debug!("Excluding {} interface {name}", raw.kind);
            name.as_str()
        })
        .collect();

    let mut builder = TopologyBuilder::new();
    for (name, raw) in &facts.interfaces {
        if excluded.contains(name.as_str()) {
            continue;
        }

        let mut links = reconciler.reconcile(name, raw)?;
        gateways.apply(&mut links)?;

        let vlan = match (&raw.kind, &raw.vlan) {
            (InterfaceKind::Vlan, Some(info)) => Some(Vlan {
                lower_device: info.lower_device.clone(),
                vid: info.vid,
            }),
            _ => None,
        };

        let mut parents = raw.declared_parents();
        parents.retain(|parent| {
            let keep = !excluded.contains(parent.as_str());
            if !keep {
                log::debug!("Dropping excluded parent {parent} of {name}");
            }
            keep
        });

        builder.insert(
            name.as_str(),
            Interface {
                kind: raw.kind.clone(),
                mac_address: raw.hwaddr.clone(),
                enabled: raw.is_up(),
                links,
                vlan,
                parents,
                monitored: false,
            },
        );
    }

    builder.build()
}
