//! Topology reconciliation.
//!
//! Turns the raw facts of one collection cycle into a normalized, validated
//! [`Topology`]: addresses get their most specific routed prefix, DHCP
//! addresses are told apart from static ones, gateways are inferred from the
//! routing table, and each interface gets its default monitoring flag.
mod builder;
mod error;
mod exclusion;
mod gateway;
mod links;
mod model;
mod pipeline;
mod subnet;

pub use builder::{TopologyBuilder, children_index};
pub use error::{Error, Result};
pub use exclusion::is_excluded;
pub use gateway::GatewayResolver;
pub use links::{LinkReconciler, ParsedAddress, parse_raw_address};
pub use model::{Interface, IpLink, LinkMode, Topology, Vlan};
pub use pipeline::build_topology;
pub use subnet::SubnetIndex;
