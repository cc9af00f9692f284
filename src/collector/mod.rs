//! Raw fact collection.
//!
//! Runs the `machine-resources` probe and `ip -json route` and parses their
//! output into [`MachineFacts`].
mod error;
mod model;
mod probe;

pub use error::{Error, Result};
pub use model::{
    AddressFamily, BondInfo, BridgeInfo, InterfaceKind, LinkState, MachineDescription,
    ProbeEnvironment, RawAddress, RawInterface, Route, RouteTable, VlanInfo,
};
pub use probe::{MachineFacts, ResourceCollector, parse_machine_description, parse_routes};
