use serde::Serialize;

/// The interfaces of one machine, as sent to the region controller.
#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct UpdateInterfaces {
    /// Machine identity; empty when none is known yet.
    #[prost(string, tag = "1")]
    pub system_id: String,
    #[prost(message, repeated, tag = "2")]
    pub interfaces: Vec<InterfaceMessage>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct InterfaceMessage {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub mac_address: String,
    #[prost(string, tag = "3")]
    #[serde(rename = "type")]
    pub kind: String,
    #[prost(bool, tag = "4")]
    pub enabled: bool,
    #[prost(bool, tag = "5")]
    pub monitored: bool,
    #[prost(uint32, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u32>,
    #[prost(string, repeated, tag = "7")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[prost(message, repeated, tag = "8")]
    pub links: Vec<LinkMessage>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct LinkMessage {
    /// `static` or `dhcp`.
    #[prost(string, tag = "1")]
    pub mode: String,
    /// `ip/prefix`, or the bare IP for host-exact addresses.
    #[prost(string, tag = "2")]
    pub address: String,
    #[prost(string, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[prost(uint32, tag = "4")]
    pub prefix_len: u32,
}
