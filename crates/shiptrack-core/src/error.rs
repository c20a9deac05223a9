//! Error types for the ShipTrack system
//!
//! Two classes of failure exist side by side. Structural failures
//! ([`Error::UnsupportedCarrier`], [`Error::ProviderNotFound`]) propagate to
//! the caller. Carrier-level failures (network, timeout, not-found,
//! unparseable payloads, carrier business errors) are contained by the
//! resolver and converted into degraded mock/synthetic results.

use crate::model::CarrierId;
use thiserror::Error;

/// Result type alias for ShipTrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ShipTrack system
#[derive(Error, Debug)]
pub enum Error {
    /// Input matches no known carrier format (client-input class)
    #[error("unsupported carrier: '{0}' matches no known tracking-number format")]
    UnsupportedCarrier(String),

    /// Carrier detected but the registry has no provider for it
    /// (internal-fault class, unreachable given registry guarantees)
    #[error("no provider registered for carrier {0}")]
    ProviderNotFound(CarrierId),

    /// Carrier API call failed (HTTP status, transport, carrier business error)
    #[error("carrier API error ({carrier}): {message}")]
    CarrierApi {
        /// Carrier whose API failed
        carrier: CarrierId,
        /// Error message
        message: String,
    },

    /// Carrier call exceeded the provider-configured timeout
    #[error("carrier request timed out ({carrier}) after {timeout_secs}s")]
    Timeout {
        /// Carrier whose call timed out
        carrier: CarrierId,
        /// Configured timeout in seconds
        timeout_secs: u64,
    },

    /// Carrier reported the tracking number as unknown
    #[error("tracking number not found at {carrier}: {tracking_number}")]
    NotFound {
        /// Carrier that was queried
        carrier: CarrierId,
        /// The queried tracking number
        tracking_number: String,
    },

    /// Carrier refused the request for regional-availability reasons (USPS)
    #[error("geographic restriction ({carrier}): {message}")]
    GeographicRestriction {
        /// Carrier enforcing the restriction
        carrier: CarrierId,
        /// Carrier-supplied description
        message: String,
    },

    /// Response body did not match the expected carrier format
    #[error("unparseable {carrier} response: {message}")]
    InvalidResponse {
        /// Carrier whose response failed to parse
        carrier: CarrierId,
        /// Parse failure detail
        message: String,
    },

    /// Authentication against the carrier failed (OAuth token, rejected key)
    #[error("authentication failed ({carrier}): {message}")]
    Authentication {
        /// Carrier that rejected the credentials
        carrier: CarrierId,
        /// Failure detail
        message: String,
    },

    /// Provider construction/initialization failed at registry startup
    #[error("provider initialization failed ({carrier}): {message}")]
    Initialization {
        /// Carrier whose provider failed to come up
        carrier: CarrierId,
        /// Failure detail
        message: String,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// History store errors
    #[error("history store error: {0}")]
    HistoryStore(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a carrier API error
    pub fn carrier_api(carrier: CarrierId, message: impl Into<String>) -> Self {
        Self::CarrierApi {
            carrier,
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(carrier: CarrierId, timeout_secs: u64) -> Self {
        Self::Timeout {
            carrier,
            timeout_secs,
        }
    }

    /// Create a not-found error
    pub fn not_found(carrier: CarrierId, tracking_number: impl Into<String>) -> Self {
        Self::NotFound {
            carrier,
            tracking_number: tracking_number.into(),
        }
    }

    /// Create a geographic restriction error
    pub fn geographic(carrier: CarrierId, message: impl Into<String>) -> Self {
        Self::GeographicRestriction {
            carrier,
            message: message.into(),
        }
    }

    /// Create an unparseable-response error
    pub fn invalid_response(carrier: CarrierId, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            carrier,
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(carrier: CarrierId, message: impl Into<String>) -> Self {
        Self::Authentication {
            carrier,
            message: message.into(),
        }
    }

    /// Create a provider initialization error
    pub fn initialization(carrier: CarrierId, message: impl Into<String>) -> Self {
        Self::Initialization {
            carrier,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a history store error
    pub fn history_store(msg: impl Into<String>) -> Self {
        Self::HistoryStore(msg.into())
    }

    /// Whether this error is structural (propagates to the resolver's caller)
    /// rather than a carrier-level condition the resolver degrades on.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedCarrier(_) | Self::ProviderNotFound(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
