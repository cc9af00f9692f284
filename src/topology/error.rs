use crate::collector::AddressFamily;

/// Errors that abort a reconciliation pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("interface `{interface}` has invalid address `{address}`: {source}")]
    InvalidAddress {
        interface: String,
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("interface `{interface}` has invalid prefix `{prefix}` for address `{address}`")]
    InvalidPrefix {
        interface: String,
        address: String,
        prefix: String,
    },
    #[error("invalid network for `{address}`: {source}")]
    InvalidNetwork {
        address: String,
        #[source]
        source: ipnetwork::IpNetworkError,
    },
    #[error("invalid {family} route destination `{dst}`: {source}")]
    InvalidRouteDestination {
        family: AddressFamily,
        dst: String,
        #[source]
        source: ipnetwork::IpNetworkError,
    },
    #[error("{family} route table contains foreign destination `{dst}`")]
    RouteFamilyMismatch { family: AddressFamily, dst: String },
    #[error("interface `{interface}` references unknown parent `{parent}`")]
    DanglingParent { interface: String, parent: String },
}

pub type Result<T> = std::result::Result<T, Error>;
