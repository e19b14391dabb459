//! A resolved gateway: where to send actions and how it was reached.

use std::net::SocketAddr;

use igd_discovery::{
    resolve_service, DescriptionFetcher, DiscoveryError, ServiceDescriptor, SsdpClient, WAN_CONNECTION_SERVICES,
};
use soap_client::{ActionRequest, ActionResponse, SoapClient};
use url::Url;

use crate::error::{ApiError, Result};

/// The WAN connection service of a discovered gateway.
#[derive(Debug, Clone)]
pub struct Gateway {
    service: ServiceDescriptor,
    local_address: SocketAddr,
    remote_endpoint: SocketAddr,
    soap: SoapClient,
}

impl Gateway {
    /// Wrap an already resolved service.
    ///
    /// `local_address` is the discovery socket that heard the gateway and
    /// `remote_endpoint` the address the answer came from.
    pub fn new(service: ServiceDescriptor, local_address: SocketAddr, remote_endpoint: SocketAddr) -> Self {
        Self {
            service,
            local_address,
            remote_endpoint,
            soap: SoapClient::new(),
        }
    }

    /// Send actions through `soap` instead of a fresh client
    pub fn with_soap_client(mut self, soap: SoapClient) -> Self {
        self.soap = soap;
        self
    }

    /// Search for `device_type` and resolve the WAN connection service of the
    /// first device that answered with a `LOCATION`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::GatewayNotFound`] if no interface got a usable answer
    /// - [`ApiError::Discovery`] if the search, the description fetch or the
    ///   service lookup fails
    pub async fn resolve(ssdp: &SsdpClient, fetcher: &DescriptionFetcher, device_type: &str) -> Result<Self> {
        let outcomes = ssdp.search(device_type).await?;

        let (response, raw_location) = outcomes
            .iter()
            .filter_map(|outcome| outcome.response())
            .find_map(|response| Some((response, response.location()?)))
            .ok_or(ApiError::GatewayNotFound)?;

        let location = Url::parse(raw_location).map_err(|e| DiscoveryError::InvalidUrl {
            url: raw_location.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(%location, remote = %response.remote, local = %response.local, "Gateway answered");

        let description = fetcher.fetch(&location).await?;
        let service = resolve_service(&description, &location, &WAN_CONNECTION_SERVICES)?;

        Ok(Self::new(service, response.local, response.remote))
    }

    /// Invoke `request` on the gateway's control URL
    pub async fn invoke(&self, request: &ActionRequest) -> Result<ActionResponse> {
        let response = self
            .soap
            .invoke(self.service.control_url.as_str(), &self.service.service_type, request)
            .await?;
        Ok(response)
    }

    pub fn control_url(&self) -> &Url {
        &self.service.control_url
    }

    pub fn service_type(&self) -> &str {
        &self.service.service_type
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Local address of the interface the gateway answered on
    pub fn local_address(&self) -> SocketAddr {
        self.local_address
    }

    pub fn remote_endpoint(&self) -> SocketAddr {
        self.remote_endpoint
    }
}
