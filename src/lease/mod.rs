//! DHCP lease discovery.
//!
//! Finds running `dhclient` processes through procfs, follows their `-lf`
//! argument to the lease file, and keeps the most recent fixed address per
//! interface.
mod error;
mod parser;
mod store;

pub use error::{Error, Result};
pub use parser::{LeaseBlocks, fixed_address, latest_fixed_address, lease_blocks};
pub use store::{DHCP_CLIENT_COMMAND, DhcpClient, LeaseRecord, LeaseStore, parse_cmdline};
