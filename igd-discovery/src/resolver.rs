//! Service selection and URL resolution against a device description.

use url::Url;

use crate::description::DeviceDescription;
use crate::error::{DiscoveryError, Result};

/// WAN connection services able to manage port mappings, in preference order
pub const WAN_CONNECTION_SERVICES: [&str; 3] = [
    "urn:schemas-upnp-org:service:WANIPConnection:1",
    "urn:schemas-upnp-org:service:WANIPConnection:2",
    "urn:schemas-upnp-org:service:WANPPPConnection:1",
];

/// A selected service with absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service_type: String,
    pub control_url: Url,
    /// The service's SCPD document
    pub description_url: Url,
}

/// Pick the first whitelisted service, in document order, that has both a
/// control URL and an SCPD URL, and resolve those against the description's
/// base URL.
///
/// The whitelist only filters; its own order does not matter.
pub fn resolve_service(
    description: &DeviceDescription,
    location: &Url,
    whitelist: &[&str],
) -> Result<ServiceDescriptor> {
    let (service, control, scpd) = description
        .services()
        .into_iter()
        .filter(|service| whitelist.contains(&service.service_type.as_str()))
        .find_map(|service| {
            let control = non_empty(service.control_url.as_deref())?;
            let scpd = non_empty(service.scpd_url.as_deref())?;
            Some((service, control, scpd))
        })
        .ok_or(DiscoveryError::ServiceNotFound)?;

    let base = base_url(description, location)?;
    let descriptor = ServiceDescriptor {
        service_type: service.service_type.clone(),
        control_url: resolve_url(&base, control)?,
        description_url: resolve_url(&base, scpd)?,
    };

    tracing::debug!(
        service_type = %descriptor.service_type,
        control_url = %descriptor.control_url,
        "Resolved gateway service"
    );
    Ok(descriptor)
}

/// The declared `URLBase`, or the URL the description was fetched from
pub fn base_url(description: &DeviceDescription, location: &Url) -> Result<Url> {
    match description.url_base.as_deref() {
        Some(base) => Url::parse(base).map_err(|e| invalid_url(base, e)),
        None => Ok(location.clone()),
    }
}

/// Resolve a URL that a device may emit either absolute or as a bare path.
///
/// An absolute URL with a host is returned unchanged; anything else is joined
/// onto `base`, which supplies the missing scheme and host.
pub fn resolve_url(base: &Url, raw: &str) -> Result<Url> {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) if url.has_host() => Ok(url),
        _ => base.join(raw).map_err(|e| invalid_url(raw, e)),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn invalid_url(url: &str, error: url::ParseError) -> DiscoveryError {
    DiscoveryError::InvalidUrl {
        url: url.to_string(),
        reason: error.to_string(),
    }
}
