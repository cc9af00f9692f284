//! Outbound wire messages and their publication.
mod adapter;
mod error;
mod messages;
mod publisher;

pub use adapter::RpcAdapter;
pub use error::{Error, Result};
pub use messages::{InterfaceMessage, LinkMessage, UpdateInterfaces};
pub use publisher::{JsonLinesPublisher, Publisher, StdoutPublisher};
