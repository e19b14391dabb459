//! Port mapping API for UPnP Internet Gateway Devices
//!
//! This crate drives the gateway found on the local network: it looks the
//! gateway up with SSDP, resolves its WAN connection service and issues the
//! `WANIPConnection` / `WANPPPConnection` actions over SOAP.
//!
//! # Quick Start
//!
//! ```no_run
//! use igd_api::{ClientOptions, GetMappingOptions, Mapping, Protocol, Unmapping, UpnpClient};
//!
//! # async fn run() -> igd_api::Result<()> {
//! let client = UpnpClient::new(ClientOptions::default().with_description("my-server"))?;
//!
//! client
//!     .mapping(Mapping::new(25565).with_protocol(Protocol::Tcp).with_ttl(600))
//!     .await?;
//!
//! let mine = client.get_mapping(GetMappingOptions::default()).await?;
//! println!("{} mapping(s) for this host", mine.len());
//!
//! client.unmapping(Unmapping::new(25565)).await?;
//! client.destroy();
//! # Ok(())
//! # }
//! ```
//!
//! # Lower level access
//!
//! [`Gateway`] exposes the resolved control endpoint and raw action
//! invocation for actions this crate does not wrap.

pub mod client;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod mapping;

pub use client::{parse_protocols, ClientOptions, UpnpClient, DEFAULT_DESCRIPTION, DEFAULT_TTL};
pub use error::{ApiError, Result, ValidationError};
pub use gateway::Gateway;
pub use mapping::{GetMappingOptions, Mapping, PortMapping, Protocol, Unmapping};

pub use igd_discovery::{InterfaceBinding, SsdpConfig};
pub use soap_client::{ActionRequest, ActionResponse};
