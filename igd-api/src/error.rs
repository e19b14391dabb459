use igd_discovery::DiscoveryError;
use soap_client::SoapError;
use thiserror::Error;

/// High-level API errors for gateway operations
///
/// Wraps the discovery and SOAP layers and adds the failure cases that only
/// make sense once a gateway is being driven: no gateway answered, a reply
/// that lacks the fields an action promises, or a caller-supplied value the
/// gateway would reject.
#[derive(Debug, Error)]
pub enum ApiError {
    /// SOAP transport, decoding or device fault
    #[error("SOAP error: {0}")]
    Soap(#[from] SoapError),

    /// SSDP search, description fetch or service resolution failed
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The search settled without any interface reporting a gateway location
    #[error("No gateway responded to the search")]
    GatewayNotFound,

    /// The gateway answered but the result lacks or garbles an expected field
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid parameter value
    ///
    /// Covers ports outside 1-65535 and unknown protocol names.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// The UPnP error code when the gateway answered with a fault
    pub fn fault_code(&self) -> Option<&str> {
        match self {
            ApiError::Soap(error) => error.fault_code(),
            _ => None,
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Validation error types
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Parameter '{parameter}' value '{value}' is out of range ({min}..={max})")]
    RangeError {
        parameter: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Parameter '{parameter}' value '{value}' is invalid: {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },
}

impl ValidationError {
    pub fn range_error(
        parameter: &str,
        min: impl std::fmt::Display,
        max: impl std::fmt::Display,
        value: impl std::fmt::Display,
    ) -> Self {
        Self::RangeError {
            parameter: parameter.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn invalid_value(parameter: &str, value: impl std::fmt::Display, reason: &str) -> Self {
        Self::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(validation_error: ValidationError) -> Self {
        match validation_error {
            ValidationError::RangeError {
                parameter,
                value,
                min,
                max,
            } => ApiError::InvalidParameter(format!(
                "Parameter '{}' value {} is out of range [{}, {}]",
                parameter, value, min, max
            )),
            ValidationError::InvalidValue {
                parameter,
                value,
                reason,
            } => ApiError::InvalidParameter(format!(
                "Invalid value '{}' for parameter '{}': {}",
                value, parameter, reason
            )),
        }
    }
}
