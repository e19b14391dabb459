//! Port mapping requests, entries and the WAN connection actions behind them.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use soap_client::{ActionRequest, ActionResponse};
use xmltree::{Element, XMLNode};

use crate::error::{ApiError, Result, ValidationError};
use crate::gateway::Gateway;

pub const GET_EXTERNAL_IP_ADDRESS: &str = "GetExternalIPAddress";
pub const ADD_PORT_MAPPING: &str = "AddPortMapping";
pub const DELETE_PORT_MAPPING: &str = "DeletePortMapping";
pub const GET_GENERIC_PORT_MAPPING_ENTRY: &str = "GetGenericPortMappingEntry";

/// `SpecifiedArrayIndexInvalid`: the index is past the end of the table
pub const FAULT_ARRAY_INDEX_INVALID: &str = "713";
/// `NoSuchEntryInArray`
pub const FAULT_NO_SUCH_ENTRY: &str = "714";

/// Attempts made for the first table entry before giving up
pub const INITIAL_ENTRY_ATTEMPTS: usize = 3;
/// Upper bound on the number of entries read from one gateway
pub const MAX_MAPPING_ENTRIES: u32 = 1024;

/// Transport protocol of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Wire representation (`TCP` / `UDP`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ValidationError;

    /// Case-insensitive `tcp` / `udp`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            _ => Err(ValidationError::invalid_value("protocol", s, "expected TCP or UDP")),
        }
    }
}

/// A port mapping to add.
///
/// Unset fields fall back to the client's options: the internal port to the
/// remote port, the internal host to the local address the gateway was found
/// on, and the protocol to every configured protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Remote host allowed to use the mapping; empty means any
    pub remote_host: String,
    /// Public port on the gateway
    pub remote_port: u16,
    pub protocol: Option<Protocol>,
    pub internal_host: Option<IpAddr>,
    pub internal_port: Option<u16>,
    pub enabled: bool,
    pub description: Option<String>,
    /// Lease duration in seconds; `0` is permanent
    pub ttl: Option<u32>,
}

impl Mapping {
    pub fn new(remote_port: u16) -> Self {
        Self {
            remote_host: String::new(),
            remote_port,
            protocol: None,
            internal_host: None,
            internal_port: None,
            enabled: true,
            description: None,
            ttl: None,
        }
    }

    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = host.into();
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn with_internal_host(mut self, host: IpAddr) -> Self {
        self.internal_host = Some(host);
        self
    }

    pub fn with_internal_port(mut self, port: u16) -> Self {
        self.internal_port = Some(port);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Build the `AddPortMapping` request for one protocol, with the
    /// client-level defaults already resolved by the caller
    pub fn add_request(&self, protocol: Protocol, internal_host: IpAddr, description: &str, ttl: u32) -> ActionRequest {
        ActionRequest::new(ADD_PORT_MAPPING)
            .arg("NewRemoteHost", &self.remote_host)
            .arg("NewExternalPort", self.remote_port)
            .arg("NewProtocol", protocol)
            .arg("NewInternalPort", self.internal_port.unwrap_or(self.remote_port))
            .arg("NewInternalClient", internal_host)
            .arg("NewEnabled", u8::from(self.enabled))
            .arg("NewPortMappingDescription", description)
            .arg("NewLeaseDuration", ttl)
    }
}

/// A port mapping to remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unmapping {
    pub remote_host: String,
    pub remote_port: u16,
    /// `None` removes the mapping for every configured protocol
    pub protocol: Option<Protocol>,
}

impl Unmapping {
    pub fn new(remote_port: u16) -> Self {
        Self {
            remote_host: String::new(),
            remote_port,
            protocol: None,
        }
    }

    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = host.into();
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Build the `DeletePortMapping` request for one protocol
    pub fn delete_request(&self, protocol: Protocol) -> ActionRequest {
        ActionRequest::new(DELETE_PORT_MAPPING)
            .arg("NewRemoteHost", &self.remote_host)
            .arg("NewExternalPort", self.remote_port)
            .arg("NewProtocol", protocol)
    }
}

/// Filters for [`UpnpClient::get_mapping`](crate::UpnpClient::get_mapping)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetMappingOptions {
    /// Keep entries whose description differs from the client's
    pub all_clients: bool,
    /// Keep entries that point at other hosts on the LAN
    pub all_devices: bool,
}

/// One entry of the gateway's port mapping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub remote_host: String,
    pub remote_port: u16,
    pub internal_host: String,
    pub internal_port: u16,
    pub protocol: Protocol,
    pub enabled: bool,
    pub description: String,
    pub ttl: u32,
    /// Whether the entry points at the local address the gateway was found on
    pub local: bool,
}

impl PortMapping {
    /// Decode a `GetGenericPortMappingEntryResponse` element.
    ///
    /// Missing or malformed numeric, boolean and protocol fields are errors.
    pub fn from_entry(entry: &Element, local_address: IpAddr) -> Result<Self> {
        let internal_host = field(entry, "NewInternalClient").unwrap_or_default();
        let local = internal_host.parse::<IpAddr>().map_or(false, |host| host == local_address);

        Ok(Self {
            remote_host: field(entry, "NewRemoteHost").unwrap_or_default(),
            remote_port: parse_field(entry, "NewExternalPort")?,
            internal_port: parse_field(entry, "NewInternalPort")?,
            protocol: required(entry, "NewProtocol")?
                .parse()
                .map_err(|e: ValidationError| ApiError::InvalidResponse(e.to_string()))?,
            enabled: parse_bool(&required(entry, "NewEnabled")?)
                .ok_or_else(|| ApiError::InvalidResponse("NewEnabled is not a boolean".to_string()))?,
            description: field(entry, "NewPortMappingDescription").unwrap_or_default(),
            ttl: parse_field(entry, "NewLeaseDuration")?,
            internal_host,
            local,
        })
    }
}

pub(crate) fn validate_port(parameter: &str, port: u16) -> std::result::Result<u16, ValidationError> {
    if port == 0 {
        Err(ValidationError::range_error(parameter, 1, u16::MAX, port))
    } else {
        Ok(port)
    }
}

/// Ask the gateway for its public address
pub async fn external_ip_address(gateway: &Gateway) -> Result<String> {
    let response = gateway.invoke(&ActionRequest::new(GET_EXTERNAL_IP_ADDRESS)).await?;
    response
        .value(GET_EXTERNAL_IP_ADDRESS, "NewExternalIPAddress")
        .ok_or_else(|| ApiError::InvalidResponse("missing NewExternalIPAddress".to_string()))
}

/// Read the table entry at `index`
pub async fn port_mapping_entry(gateway: &Gateway, index: u32) -> Result<PortMapping> {
    let request = ActionRequest::new(GET_GENERIC_PORT_MAPPING_ENTRY).arg("NewPortMappingIndex", index);
    let response = gateway.invoke(&request).await?;
    let entry = entry_element(&response)?;
    PortMapping::from_entry(entry, gateway.local_address().ip())
}

/// Read the gateway's whole port mapping table.
///
/// The table ends at fault 713 or 714. The first entry is retried up to
/// [`INITIAL_ENTRY_ATTEMPTS`] times since some gateways fail the first call
/// after a quiet period. Past the first entry any other fault also ends the
/// table, while transport and decoding errors are returned.
pub async fn port_mapping_entries(gateway: &Gateway) -> Result<Vec<PortMapping>> {
    let mut entries = Vec::new();
    let mut attempts = 0;
    let mut index = 0;

    while index < MAX_MAPPING_ENTRIES {
        match port_mapping_entry(gateway, index).await {
            Ok(entry) => {
                entries.push(entry);
                index += 1;
            }
            Err(error) if is_end_of_table(&error) => break,
            Err(error) if index == 0 => {
                attempts += 1;
                if attempts >= INITIAL_ENTRY_ATTEMPTS {
                    return Err(error);
                }
                tracing::debug!(attempt = attempts, error = %error, "Retrying first port mapping entry");
            }
            Err(ApiError::Soap(fault @ soap_client::SoapError::Fault { .. })) => {
                tracing::warn!(index, error = %fault, "Port mapping enumeration stopped by fault");
                break;
            }
            Err(error) => return Err(error),
        }
    }

    tracing::debug!(count = entries.len(), "Read port mapping table");
    Ok(entries)
}

fn is_end_of_table(error: &ApiError) -> bool {
    matches!(error.fault_code(), Some(FAULT_ARRAY_INDEX_INVALID) | Some(FAULT_NO_SUCH_ENTRY))
}

fn entry_element(response: &ActionResponse) -> Result<&Element> {
    response
        .action_result(GET_GENERIC_PORT_MAPPING_ENTRY)
        .ok_or_else(|| ApiError::InvalidResponse(format!("missing {}Response", GET_GENERIC_PORT_MAPPING_ENTRY)))
}

fn field(entry: &Element, name: &str) -> Option<String> {
    entry
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .find(|child| child.name == name)
        .map(|child| child.get_text().map(|text| text.trim().to_string()).unwrap_or_default())
}

fn required(entry: &Element, name: &str) -> Result<String> {
    field(entry, name).ok_or_else(|| ApiError::InvalidResponse(format!("missing {}", name)))
}

fn parse_field<T: FromStr>(entry: &Element, name: &str) -> Result<T> {
    let value = required(entry, name)?;
    value
        .parse()
        .map_err(|_| ApiError::InvalidResponse(format!("{} is not a number: '{}'", name, value)))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}
