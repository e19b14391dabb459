//! Error types for the SOAP client

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The response body of a successful call is not well-formed XML
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// The response does not have the envelope structure we expect
    #[error("Invalid SOAP response: {0}")]
    InvalidResponse(String),

    /// SOAP fault returned by the device
    #[error("SOAP fault {code}: {description}")]
    Fault {
        /// UPnP `errorCode`, verbatim
        code: String,
        /// UPnP `errorDescription`, verbatim
        description: String,
    },
}

impl SoapError {
    /// The device-reported error code, if this is a fault
    pub fn fault_code(&self) -> Option<&str> {
        match self {
            SoapError::Fault { code, .. } => Some(code),
            _ => None,
        }
    }
}
