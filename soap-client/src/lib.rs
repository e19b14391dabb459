//! SOAP control client for UPnP Internet Gateway Devices
//!
//! This crate provides a minimal asynchronous SOAP client for invoking
//! actions on a gateway's control URL. It builds the request envelope,
//! posts it over HTTP and decodes either the action result or the
//! structured UPnP fault returned by the device.
//!
//! ```no_run
//! use soap_client::{ActionRequest, SoapClient};
//!
//! # async fn run() -> Result<(), soap_client::SoapError> {
//! let client = SoapClient::new();
//! let response = client
//!     .invoke(
//!         "http://192.168.1.1:5000/ctl/IPConn",
//!         "urn:schemas-upnp-org:service:WANIPConnection:1",
//!         &ActionRequest::new("GetExternalIPAddress"),
//!     )
//!     .await?;
//! println!("{:?}", response.value("GetExternalIPAddress", "NewExternalIPAddress"));
//! # Ok(())
//! # }
//! ```

mod envelope;
mod error;
mod response;

pub use envelope::{ActionArgument, ActionRequest, ENCODING_STYLE, ENVELOPE_NAMESPACE};
pub use error::SoapError;
pub use response::{namespace_prefix, ActionResponse};

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use xmltree::Element;

const CONTENT_TYPE_XML: &str = "text/xml; charset=\"utf-8\"";

/// Per-action deadline covering connect, send and reading the reply
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A minimal SOAP client for UPnP device control
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl SoapClient {
    /// Create a new SOAP client with the default timeout
    pub fn new() -> Self {
        Self::with_http_client(reqwest::Client::new())
    }

    /// Create a SOAP client on top of an existing HTTP client
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the per-action timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke `request` on the service at `control_url`.
    ///
    /// Returns the decoded `Body` on a success status. A non-success status is
    /// turned into [`SoapError::Fault`] when the body carries a well-formed UPnP
    /// fault, and [`SoapError::InvalidResponse`] otherwise. No retries.
    pub async fn invoke(
        &self,
        control_url: &str,
        service_type: &str,
        request: &ActionRequest,
    ) -> Result<ActionResponse, SoapError> {
        let body = request.envelope(service_type);
        tracing::debug!(
            action = request.action(),
            service_type,
            control_url,
            "Invoking SOAP action"
        );

        let response = self
            .http
            .post(control_url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, CONTENT_TYPE_XML)
            .header(CONTENT_LENGTH, body.len())
            .header("SOAPAction", request.soap_action(service_type))
            .body(body)
            .send()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        let status = response.status();
        let xml_text = response
            .text()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(action = request.action(), %status, "SOAP action failed");
            let xml = Element::parse(xml_text.as_bytes()).map_err(|e| {
                SoapError::InvalidResponse(format!("HTTP {} with undecodable body: {}", status, e))
            })?;
            return Err(response::extract_fault(&xml)?);
        }

        let xml = Element::parse(xml_text.as_bytes()).map_err(|e| SoapError::Parse(e.to_string()))?;
        ActionResponse::from_envelope(xml)
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}
