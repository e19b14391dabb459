//! UPnP gateway discovery library
//!
//! This crate finds UPnP devices on the local network with SSDP and resolves
//! the control endpoint of a gateway's WAN connection service from its
//! device description.
//!
//! # Quick Start
//!
//! ```no_run
//! use igd_discovery::{search_once, INTERNET_GATEWAY_DEVICE};
//! use std::time::Duration;
//!
//! # async fn run() -> igd_discovery::Result<()> {
//! for outcome in search_once(INTERNET_GATEWAY_DEVICE, Duration::from_secs(2)).await? {
//!     if let Some(location) = outcome.response().and_then(|r| r.location()) {
//!         println!("{} answered from {}", outcome.interface, location);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Resolving a service
//!
//! ```no_run
//! use igd_discovery::{resolve_service, DescriptionFetcher, WAN_CONNECTION_SERVICES};
//! use std::time::Duration;
//! use url::Url;
//!
//! # async fn run() -> igd_discovery::Result<()> {
//! let location = Url::parse("http://192.168.1.1:5000/rootDesc.xml").unwrap();
//! let fetcher = DescriptionFetcher::new(Duration::from_secs(5))?;
//! let description = fetcher.fetch(&location).await?;
//! let service = resolve_service(&description, &location, &WAN_CONNECTION_SERVICES)?;
//! println!("control URL: {}", service.control_url);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod description;
pub mod interfaces;
pub mod resolver;
pub mod ssdp;

pub use description::{DescriptionFetcher, DeviceDescription, DeviceNode, ServiceNode};
pub use error::{DiscoveryError, Result, SearchError};
pub use interfaces::{local_interfaces, InterfaceBinding};
pub use resolver::{resolve_service, resolve_url, ServiceDescriptor, WAN_CONNECTION_SERVICES};
pub use ssdp::{DiscoveryOutcome, SsdpClient, SsdpConfig, SsdpResponse};

use std::time::Duration;

/// Search target of Internet Gateway Devices
pub const INTERNET_GATEWAY_DEVICE: &str = "urn:schemas-upnp-org:device:InternetGatewayDevice:1";

/// Run a single search on every local interface with a custom timeout.
///
/// The sockets are closed before this returns.
pub async fn search_once(device_type: &str, timeout: Duration) -> Result<Vec<DiscoveryOutcome>> {
    let client = SsdpClient::new(SsdpConfig::default().with_timeout(timeout));
    let outcomes = client.search(device_type).await;
    client.destroy();
    outcomes
}
