//! Device description fetching and parsing.
//!
//! A UPnP description document nests devices in `deviceList` and services in
//! `serviceList`. Either list may hold one or many entries, possibly
//! interleaved with vendor elements; decoding collects them into `Vec`s and
//! the list wrappers are flattened away so callers walk a uniform tree.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{DiscoveryError, Result};

#[derive(Debug, Deserialize)]
struct RootXml {
    #[serde(rename = "URLBase", default)]
    url_base: Option<String>,
    device: DeviceXml,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceXml {
    #[serde(default)]
    device_type: Option<String>,
    #[serde(default)]
    friendly_name: Option<String>,
    #[serde(rename = "UDN", default)]
    udn: Option<String>,
    #[serde(default)]
    service_list: Option<ServiceListXml>,
    #[serde(default)]
    device_list: Option<DeviceListXml>,
}

#[derive(Debug, Deserialize)]
struct ServiceListXml {
    #[serde(rename = "service", default)]
    services: Vec<ServiceNode>,
}

#[derive(Debug, Deserialize)]
struct DeviceListXml {
    #[serde(rename = "device", default)]
    devices: Vec<DeviceXml>,
}

/// A service entry of a device description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(rename = "controlURL", default)]
    pub control_url: Option<String>,
    #[serde(rename = "SCPDURL", default)]
    pub scpd_url: Option<String>,
    #[serde(rename = "eventSubURL", default)]
    pub event_sub_url: Option<String>,
}

/// A device with its own services and embedded devices, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNode {
    pub device_type: Option<String>,
    pub friendly_name: Option<String>,
    pub udn: Option<String>,
    pub services: Vec<ServiceNode>,
    pub devices: Vec<DeviceNode>,
}

impl From<DeviceXml> for DeviceNode {
    fn from(xml: DeviceXml) -> Self {
        Self {
            device_type: xml.device_type,
            friendly_name: xml.friendly_name,
            udn: xml.udn,
            services: xml.service_list.map(|list| list.services).unwrap_or_default(),
            devices: xml
                .device_list
                .map(|list| list.devices.into_iter().map(DeviceNode::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Parsed UPnP device description document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    /// Declared `URLBase`, if present and non-empty
    pub url_base: Option<String>,
    /// The root device
    pub device: DeviceNode,
}

impl DeviceDescription {
    /// Parse device description from XML.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::ParseError` if the XML is malformed or has no root device.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root: RootXml = quick_xml::de::from_str(xml)
            .map_err(|e| DiscoveryError::ParseError(format!("Failed to parse device description: {}", e)))?;

        Ok(Self {
            url_base: root
                .url_base
                .map(|base| base.trim().to_string())
                .filter(|base| !base.is_empty()),
            device: root.device.into(),
        })
    }

    /// Every service in the tree, depth-first: a device's own services come
    /// before those of its embedded devices.
    pub fn services(&self) -> Vec<&ServiceNode> {
        fn collect<'a>(device: &'a DeviceNode, out: &mut Vec<&'a ServiceNode>) {
            out.extend(device.services.iter());
            for child in &device.devices {
                collect(child, out);
            }
        }

        let mut services = Vec::new();
        collect(&self.device, &mut services);
        services
    }

    /// Every device in the tree, depth-first, root first
    pub fn devices(&self) -> Vec<&DeviceNode> {
        fn collect<'a>(device: &'a DeviceNode, out: &mut Vec<&'a DeviceNode>) {
            out.push(device);
            for child in &device.devices {
                collect(child, out);
            }
        }

        let mut devices = Vec::new();
        collect(&self.device, &mut devices);
        devices
    }
}

/// Fetches device descriptions over HTTP.
#[derive(Debug, Clone)]
pub struct DescriptionFetcher {
    http: reqwest::Client,
}

impl DescriptionFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// GET and parse the description at `url`. No retries.
    pub async fn fetch(&self, url: &Url) -> Result<DeviceDescription> {
        tracing::debug!(%url, "Fetching device description");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to fetch device description: {}", e)))?;

        let xml = response
            .text()
            .await
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to read response body: {}", e)))?;

        DeviceDescription::from_xml(&xml)
    }
}
