//! Carrier configuration and credentials
//!
//! One static [`CarrierConfig`] exists per carrier, loaded once at registry
//! initialization and treated as immutable for the process lifetime.
//! [`CarrierCredentials`] are read from the environment at the same moment
//! and never re-read.

use crate::detect;
use crate::model::{CarrierId, TrackingEvent, TrackingInfo, TrackingStatus};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Default per-request timeout when a carrier config does not set one
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Authentication scheme used against a carrier API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// No authentication header
    None,
    /// Static bearer token
    Bearer,
    /// OAuth client-credentials flow against a token endpoint
    OAuth,
    /// API key sent as a bearer header
    ApiKey,
    /// HTTP basic auth
    Basic,
}

/// Carrier-specific API paths, joined onto [`CarrierConfig::api_endpoint`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierEndpoints {
    /// OAuth token path (for `AuthType::OAuth` carriers)
    pub oauth: Option<String>,
    /// Tracking path
    pub track: String,
}

/// One canned event inside a mock record
///
/// Mock events carry a relative age rather than an absolute time: the
/// absolute timestamp is stamped at lookup time, so repeated lookups yield
/// fresh-looking records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockEvent {
    /// Raw carrier status text
    pub status: String,
    /// Event location
    pub location: Option<String>,
    /// Event detail
    pub description: Option<String>,
    /// Hours before "now" this event occurred
    pub age_hours: i64,
}

/// A canned tracking record served when live carrier data is unavailable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockRecord {
    /// Normalized status of the most recent event
    pub status: TrackingStatus,
    /// Most recent location
    pub location: Option<String>,
    /// Summary text
    pub description: Option<String>,
    /// Events, most recent first
    pub events: Vec<MockEvent>,
}

impl MockRecord {
    /// Materialize this record for a tracking number, stamping absolute
    /// timestamps from the relative event ages at lookup time.
    pub fn materialize(&self, tracking_number: &str, carrier: CarrierId) -> TrackingInfo {
        let now = Utc::now();

        let events: Vec<TrackingEvent> = self
            .events
            .iter()
            .map(|event| {
                TrackingEvent::new(
                    event.status.clone(),
                    event.location.clone(),
                    Some(now - ChronoDuration::hours(event.age_hours)),
                    event.description.clone(),
                )
            })
            .collect();

        TrackingInfo::from_events(tracking_number, carrier, self.status, events)
    }
}

/// Static, carrier-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Display name ("UPS", "FedEx", "USPS")
    pub name: String,

    /// Tracking-number detection pattern
    pub pattern: String,

    /// API base URL
    pub api_endpoint: String,

    /// Authentication scheme
    pub auth_type: AuthType,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry allowance reserved for the collaborating HTTP layer.
    /// The core itself performs no retry loop.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Carrier-specific API paths
    pub endpoints: CarrierEndpoints,

    /// Canned records by exact normalized tracking number
    #[serde(default)]
    pub mock_data: HashMap<String, MockRecord>,

    /// Ordered (substring, normalized status) pairs, tested
    /// case-insensitively against raw carrier status text. First matching
    /// substring wins; no match maps to `Unknown`.
    #[serde(default)]
    pub status_mapping: Vec<(String, TrackingStatus)>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_retries() -> u32 {
    3
}

impl CarrierConfig {
    /// The builtin configuration for a carrier
    pub fn builtin(id: CarrierId) -> Self {
        match id {
            CarrierId::Ups => ups_config(),
            CarrierId::Fedex => fedex_config(),
            CarrierId::Usps => usps_config(),
        }
    }

    /// Per-request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Map raw carrier status text to the normalized status
    pub fn map_status(&self, carrier_status: &str) -> TrackingStatus {
        let lower = carrier_status.to_lowercase();

        self.status_mapping
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map(|(_, status)| *status)
            .unwrap_or(TrackingStatus::Unknown)
    }

    /// Look up a canned record by exact normalized tracking number
    pub fn mock_record(&self, tracking_number: &str) -> Option<&MockRecord> {
        self.mock_data.get(tracking_number)
    }
}

fn ups_config() -> CarrierConfig {
    CarrierConfig {
        name: "UPS".to_string(),
        pattern: detect::UPS_PATTERN.to_string(),
        api_endpoint: "https://onlinetools.ups.com".to_string(),
        auth_type: AuthType::OAuth,
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        retries: 3,
        endpoints: CarrierEndpoints {
            oauth: Some("/security/v1/oauth/token".to_string()),
            track: "/api/track/v1/details".to_string(),
        },
        mock_data: ups_mock_data(),
        status_mapping: vec![
            ("delivered".to_string(), TrackingStatus::Delivered),
            ("out for delivery".to_string(), TrackingStatus::OutForDelivery),
            ("exception".to_string(), TrackingStatus::Exception),
            ("returned".to_string(), TrackingStatus::Exception),
            ("in transit".to_string(), TrackingStatus::InTransit),
            ("arrived at facility".to_string(), TrackingStatus::InTransit),
            ("departed".to_string(), TrackingStatus::InTransit),
            ("picked up".to_string(), TrackingStatus::InTransit),
            ("order processed".to_string(), TrackingStatus::Pending),
            ("label created".to_string(), TrackingStatus::Pending),
        ],
    }
}

fn fedex_config() -> CarrierConfig {
    CarrierConfig {
        name: "FedEx".to_string(),
        pattern: detect::FEDEX_PATTERN.to_string(),
        api_endpoint: "https://apis-sandbox.fedex.com".to_string(),
        auth_type: AuthType::OAuth,
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        retries: 3,
        endpoints: CarrierEndpoints {
            oauth: Some("/oauth/token".to_string()),
            track: "/track/v1/trackingnumbers".to_string(),
        },
        mock_data: fedex_mock_data(),
        status_mapping: vec![
            ("delivered".to_string(), TrackingStatus::Delivered),
            ("out for delivery".to_string(), TrackingStatus::OutForDelivery),
            ("on fedex vehicle".to_string(), TrackingStatus::OutForDelivery),
            ("exception".to_string(), TrackingStatus::Exception),
            ("failed".to_string(), TrackingStatus::Exception),
            ("picked up".to_string(), TrackingStatus::InTransit),
            ("in transit".to_string(), TrackingStatus::InTransit),
            ("at local fedex facility".to_string(), TrackingStatus::InTransit),
            ("shipment information sent".to_string(), TrackingStatus::Pending),
            ("pending".to_string(), TrackingStatus::Pending),
        ],
    }
}

fn usps_config() -> CarrierConfig {
    CarrierConfig {
        name: "USPS".to_string(),
        pattern: detect::USPS_PATTERN.to_string(),
        api_endpoint: "https://secure.shippingapis.com".to_string(),
        auth_type: AuthType::None,
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        retries: 3,
        endpoints: CarrierEndpoints {
            oauth: None,
            track: "/ShippingAPI.dll".to_string(),
        },
        mock_data: usps_mock_data(),
        status_mapping: vec![
            ("delivered".to_string(), TrackingStatus::Delivered),
            ("out for delivery".to_string(), TrackingStatus::OutForDelivery),
            ("alert".to_string(), TrackingStatus::Exception),
            ("notice left".to_string(), TrackingStatus::Exception),
            ("in transit".to_string(), TrackingStatus::InTransit),
            ("arrived".to_string(), TrackingStatus::InTransit),
            ("departed".to_string(), TrackingStatus::InTransit),
            ("accepted".to_string(), TrackingStatus::InTransit),
            ("pre-shipment".to_string(), TrackingStatus::Pending),
            ("shipping label created".to_string(), TrackingStatus::Pending),
        ],
    }
}

fn ups_mock_data() -> HashMap<String, MockRecord> {
    HashMap::from([(
        "1Z999AA1234567890".to_string(),
        MockRecord {
            status: TrackingStatus::InTransit,
            location: Some("Memphis, TN".to_string()),
            description: Some("Package in transit to next facility".to_string()),
            events: vec![
                MockEvent {
                    status: "In Transit".to_string(),
                    location: Some("Memphis, TN".to_string()),
                    description: Some("Package in transit to next facility".to_string()),
                    age_hours: 0,
                },
                MockEvent {
                    status: "Arrived at Facility".to_string(),
                    location: Some("Louisville, KY".to_string()),
                    description: Some("Package arrived at UPS facility".to_string()),
                    age_hours: 24,
                },
                MockEvent {
                    status: "Picked Up".to_string(),
                    location: Some("New York, NY".to_string()),
                    description: Some("Package picked up by UPS".to_string()),
                    age_hours: 48,
                },
            ],
        },
    )])
}

fn fedex_mock_data() -> HashMap<String, MockRecord> {
    HashMap::from([(
        "123456789012".to_string(),
        MockRecord {
            status: TrackingStatus::OutForDelivery,
            location: Some("Los Angeles, CA".to_string()),
            description: Some("Package out for delivery".to_string()),
            events: vec![
                MockEvent {
                    status: "Out for Delivery".to_string(),
                    location: Some("Los Angeles, CA".to_string()),
                    description: Some("Package out for delivery".to_string()),
                    age_hours: 0,
                },
                MockEvent {
                    status: "At Local Facility".to_string(),
                    location: Some("Los Angeles, CA".to_string()),
                    description: Some("Package arrived at local FedEx facility".to_string()),
                    age_hours: 12,
                },
                MockEvent {
                    status: "In Transit".to_string(),
                    location: Some("Memphis, TN".to_string()),
                    description: Some("Package in transit".to_string()),
                    age_hours: 24,
                },
            ],
        },
    )])
}

fn usps_mock_data() -> HashMap<String, MockRecord> {
    HashMap::from([(
        "9400100000000000000000".to_string(),
        MockRecord {
            status: TrackingStatus::Delivered,
            location: Some("Chicago, IL".to_string()),
            description: Some("Package delivered to recipient".to_string()),
            events: vec![
                MockEvent {
                    status: "Delivered".to_string(),
                    location: Some("Chicago, IL".to_string()),
                    description: Some("Package delivered to recipient".to_string()),
                    age_hours: 1,
                },
                MockEvent {
                    status: "Out for Delivery".to_string(),
                    location: Some("Chicago, IL".to_string()),
                    description: Some("Package out for delivery".to_string()),
                    age_hours: 2,
                },
                MockEvent {
                    status: "Arrived at Post Office".to_string(),
                    location: Some("Chicago, IL".to_string()),
                    description: Some("Package arrived at local post office".to_string()),
                    age_hours: 24,
                },
            ],
        },
    )])
}

/// Runtime secrets for one carrier
///
/// Which fields are populated depends on the carrier's [`AuthType`].
/// Loaded once at registry initialization and immutable afterwards.
#[derive(Clone, Default)]
pub struct CarrierCredentials {
    /// Static API key (bearer / api_key auth)
    pub api_key: Option<String>,
    /// OAuth client id
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<String>,
    /// Basic-auth username
    pub username: Option<String>,
    /// Basic-auth password
    pub password: Option<String>,
    /// USPS Web Tools user id (travels in the request body, not a header)
    pub user_id: Option<String>,
}

// Custom Debug implementation that hides secret material
impl std::fmt::Debug for CarrierCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mark(field: &Option<String>) -> &'static str {
            match field {
                Some(value) if !value.is_empty() => "<REDACTED>",
                _ => "<unset>",
            }
        }

        f.debug_struct("CarrierCredentials")
            .field("api_key", &mark(&self.api_key))
            .field("client_id", &mark(&self.client_id))
            .field("client_secret", &mark(&self.client_secret))
            .field("username", &mark(&self.username))
            .field("password", &mark(&self.password))
            .field("user_id", &mark(&self.user_id))
            .finish()
    }
}

impl CarrierCredentials {
    /// Read a carrier's credentials from the process environment
    ///
    /// Variables follow the deployment convention:
    /// `UPS_CLIENT_ID`/`UPS_CLIENT_SECRET`,
    /// `FEDEX_CLIENT_ID`/`FEDEX_CLIENT_SECRET`, `USPS_WEB_TOOLS_USER_ID`.
    pub fn from_env(id: CarrierId) -> Self {
        match id {
            CarrierId::Ups => Self {
                client_id: env_nonempty("UPS_CLIENT_ID"),
                client_secret: env_nonempty("UPS_CLIENT_SECRET"),
                ..Self::default()
            },
            CarrierId::Fedex => Self {
                client_id: env_nonempty("FEDEX_CLIENT_ID"),
                client_secret: env_nonempty("FEDEX_CLIENT_SECRET"),
                ..Self::default()
            },
            CarrierId::Usps => Self {
                user_id: env_nonempty("USPS_WEB_TOOLS_USER_ID"),
                ..Self::default()
            },
        }
    }

    /// Whether the fields required by an auth type are all present
    pub fn satisfies(&self, auth_type: AuthType) -> bool {
        fn set(field: &Option<String>) -> bool {
            field.as_deref().is_some_and(|v| !v.is_empty())
        }

        match auth_type {
            AuthType::None => true,
            AuthType::OAuth => set(&self.client_id) && set(&self.client_secret),
            AuthType::Bearer | AuthType::ApiKey => set(&self.api_key),
            AuthType::Basic => set(&self.username) && set(&self.password),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
