use std::time::Duration;

use igd_discovery::{DescriptionFetcher, SsdpClient, SsdpConfig, INTERNET_GATEWAY_DEVICE};
use soap_client::SoapClient;

use crate::error::{ApiError, Result, ValidationError};
use crate::gateway::Gateway;
use crate::mapping::{self, validate_port, GetMappingOptions, Mapping, PortMapping, Protocol, Unmapping};

/// Description written on mappings when none is given
pub const DEFAULT_DESCRIPTION: &str = "igd-api";
/// Default lease duration in seconds
pub const DEFAULT_TTL: u32 = 3600;

const DESCRIPTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Defaults applied to every mapping made through an [`UpnpClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Protocols used when a mapping names none
    pub protocols: Vec<Protocol>,
    /// Mapping description, also the filter `get_mapping` applies
    pub description: String,
    /// Lease duration in seconds; `0` is permanent
    pub ttl: u32,
    pub ssdp: SsdpConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            protocols: vec![Protocol::Tcp],
            description: DEFAULT_DESCRIPTION.to_string(),
            ttl: DEFAULT_TTL,
            ssdp: SsdpConfig::default(),
        }
    }
}

impl ClientOptions {
    pub fn with_protocols(mut self, protocols: Vec<Protocol>) -> Self {
        self.protocols = protocols;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_ssdp(mut self, ssdp: SsdpConfig) -> Self {
        self.ssdp = ssdp;
        self
    }
}

/// Port mapping client for the Internet Gateway Device on the local network.
///
/// Every operation searches for the gateway again, so a client keeps working
/// when the gateway restarts or the host changes networks.
///
/// ```no_run
/// use igd_api::{ClientOptions, Mapping, UpnpClient};
///
/// # async fn run() -> igd_api::Result<()> {
/// let client = UpnpClient::new(ClientOptions::default())?;
/// println!("public address: {}", client.external_address().await?);
///
/// client.mapping(Mapping::new(8080).with_internal_port(80)).await?;
/// for entry in client.get_mapping(Default::default()).await? {
///     println!("{}:{} -> {}:{}", entry.protocol, entry.remote_port, entry.internal_host, entry.internal_port);
/// }
/// client.destroy();
/// # Ok(())
/// # }
/// ```
pub struct UpnpClient {
    options: ClientOptions,
    ssdp: SsdpClient,
    fetcher: DescriptionFetcher,
    soap: SoapClient,
}

impl UpnpClient {
    /// Create a client and start binding its discovery sockets.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let fetcher = DescriptionFetcher::new(DESCRIPTION_TIMEOUT)?;
        Ok(Self::with_parts(options, fetcher, SoapClient::new()))
    }

    /// Create a client on top of existing HTTP clients
    pub fn with_parts(options: ClientOptions, fetcher: DescriptionFetcher, soap: SoapClient) -> Self {
        let ssdp = SsdpClient::new(options.ssdp.clone());
        Self {
            options,
            ssdp,
            fetcher,
            soap,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Locate the gateway and its WAN connection service
    pub async fn create_gateway(&self) -> Result<Gateway> {
        let gateway = Gateway::resolve(&self.ssdp, &self.fetcher, INTERNET_GATEWAY_DEVICE).await?;
        Ok(gateway.with_soap_client(self.soap.clone()))
    }

    /// The gateway's public IP address
    pub async fn external_address(&self) -> Result<String> {
        let gateway = self.create_gateway().await?;
        mapping::external_ip_address(&gateway).await
    }

    /// Add a port mapping, once per protocol it applies to
    pub async fn mapping(&self, mapping: Mapping) -> Result<()> {
        validate_port("remote_port", mapping.remote_port)?;
        if let Some(port) = mapping.internal_port {
            validate_port("internal_port", port)?;
        }
        let protocols = self.protocols(mapping.protocol)?;

        let gateway = self.create_gateway().await?;
        let internal_host = mapping.internal_host.unwrap_or_else(|| gateway.local_address().ip());
        let description = mapping.description.as_deref().unwrap_or(&self.options.description);
        let ttl = mapping.ttl.unwrap_or(self.options.ttl);

        for protocol in protocols {
            let request = mapping.add_request(protocol, internal_host, description, ttl);
            gateway.invoke(&request).await?;
            tracing::info!(
                %protocol,
                remote_port = mapping.remote_port,
                %internal_host,
                "Added port mapping"
            );
        }
        Ok(())
    }

    /// Remove a port mapping, once per protocol it applies to
    pub async fn unmapping(&self, unmapping: Unmapping) -> Result<()> {
        validate_port("remote_port", unmapping.remote_port)?;
        let protocols = self.protocols(unmapping.protocol)?;

        let gateway = self.create_gateway().await?;
        for protocol in protocols {
            gateway.invoke(&unmapping.delete_request(protocol)).await?;
            tracing::info!(%protocol, remote_port = unmapping.remote_port, "Removed port mapping");
        }
        Ok(())
    }

    /// List the gateway's port mappings.
    ///
    /// By default only entries made by this client for this host are kept:
    /// `all_clients` drops the description filter and `all_devices` the
    /// internal host filter.
    pub async fn get_mapping(&self, options: GetMappingOptions) -> Result<Vec<PortMapping>> {
        let gateway = self.create_gateway().await?;
        let entries = mapping::port_mapping_entries(&gateway).await?;
        Ok(filter_mappings(entries, &self.options.description, options))
    }

    /// Close the discovery sockets. Later operations fail.
    pub fn destroy(&self) {
        self.ssdp.destroy();
    }

    fn protocols(&self, requested: Option<Protocol>) -> Result<Vec<Protocol>> {
        match requested {
            Some(protocol) => Ok(vec![protocol]),
            None if self.options.protocols.is_empty() => Err(ApiError::from(ValidationError::invalid_value(
                "protocols",
                "[]",
                "no protocol configured",
            ))),
            None => Ok(self.options.protocols.clone()),
        }
    }
}

fn filter_mappings(entries: Vec<PortMapping>, description: &str, options: GetMappingOptions) -> Vec<PortMapping> {
    entries
        .into_iter()
        .filter(|entry| options.all_clients || entry.description == description)
        .filter(|entry| options.all_devices || entry.local)
        .collect()
}

/// Parse a `tcp,udp` style list
pub fn parse_protocols(list: &str) -> Result<Vec<Protocol>> {
    list.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| item.parse::<Protocol>().map_err(ApiError::from))
        .collect()
}
