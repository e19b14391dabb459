//! Error types for the discovery system.

use std::time::Duration;

use thiserror::Error;

/// Error type for discovery operations.
///
/// Per-socket search failures are not represented here: they are carried by
/// [`SearchError`] inside each [`DiscoveryOutcome`](crate::DiscoveryOutcome)
/// and never fail a search as a whole.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No discovery socket reached the bound state within the readiness window
    #[error("No discovery socket bound within {0:?}")]
    NotReady(Duration),

    /// The client was destroyed before or during the call
    #[error("Discovery client is destroyed")]
    ClientDestroyed,

    /// The description lists no whitelisted service with both a control and a description URL
    #[error("Service not found")]
    ServiceNotFound,

    /// A URL in the description (or the description location) cannot be resolved
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network-related errors (HTTP requests etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Parsing errors (XML description documents)
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Why a single socket produced no response during a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Nothing arrived within the per-search window
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// The socket was closed (by error or `destroy()`) while the listener was pending
    #[error("Socket closed")]
    SocketClosed,

    /// The query datagram could not be sent
    #[error("Failed to send M-SEARCH: {0}")]
    Send(#[from] std::io::Error),
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
