//! Canonical tracking model
//!
//! All carrier-specific payloads are normalized into [`TrackingInfo`] before
//! leaving the core. Instances are created fresh per request and never
//! mutated after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported carrier identifiers
///
/// The declaration order of [`CarrierId::ALL`] is the detection priority
/// order: if two detection patterns ever overlap, the first declared carrier
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarrierId {
    /// United Parcel Service
    #[serde(rename = "UPS")]
    Ups,
    /// FedEx
    #[serde(rename = "FedEx")]
    Fedex,
    /// United States Postal Service
    #[serde(rename = "USPS")]
    Usps,
}

impl CarrierId {
    /// All supported carriers, in detection priority order
    pub const ALL: [CarrierId; 3] = [CarrierId::Ups, CarrierId::Fedex, CarrierId::Usps];

    /// The carrier's display name, as used in normalized records
    pub fn as_str(&self) -> &'static str {
        match self {
            CarrierId::Ups => "UPS",
            CarrierId::Fedex => "FedEx",
            CarrierId::Usps => "USPS",
        }
    }
}

impl fmt::Display for CarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarrierId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPS" => Ok(CarrierId::Ups),
            "FedEx" => Ok(CarrierId::Fedex),
            "USPS" => Ok(CarrierId::Usps),
            other => Err(crate::Error::config(format!(
                "unknown carrier id: {other}"
            ))),
        }
    }
}

/// Normalized tracking status
///
/// Every carrier's free-text status vocabulary is mapped into these six
/// values via the per-carrier status-mapping table. `Unknown` is the safe
/// default when no mapping rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackingStatus {
    /// Package is moving between facilities
    #[serde(rename = "In Transit")]
    InTransit,
    /// Package is on a vehicle for final delivery
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    /// Package was delivered
    #[serde(rename = "Delivered")]
    Delivered,
    /// Delivery problem reported by the carrier
    #[serde(rename = "Exception")]
    Exception,
    /// Label created / not yet in the carrier network
    #[serde(rename = "Pending")]
    Pending,
    /// No mapping rule matched the carrier's status text
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl TrackingStatus {
    /// The wire/display form of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::InTransit => "In Transit",
            TrackingStatus::OutForDelivery => "Out for Delivery",
            TrackingStatus::Delivered => "Delivered",
            TrackingStatus::Exception => "Exception",
            TrackingStatus::Pending => "Pending",
            TrackingStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One carrier-reported event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Raw carrier status text ("Unknown" when absent)
    pub status: String,

    /// Free-text location, when the carrier supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Event time; always a valid instant
    pub timestamp: DateTime<Utc>,

    /// Human-readable detail, when the carrier supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TrackingEvent {
    /// Create an event from carrier data
    ///
    /// A missing timestamp is coerced to the current time and an empty
    /// status to `"Unknown"`, so every event carries usable values.
    pub fn new(
        status: impl Into<String>,
        location: Option<String>,
        timestamp: Option<DateTime<Utc>>,
        description: Option<String>,
    ) -> Self {
        let status = status.into();
        Self {
            status: if status.is_empty() {
                "Unknown".to_string()
            } else {
                status
            },
            location,
            timestamp: timestamp.unwrap_or_else(Utc::now),
            description,
        }
    }
}

/// The canonical normalized tracking result
///
/// Invariants:
/// - `tracking_number` is uppercase-normalized
/// - `events` is never empty; index 0 is the most recent event
/// - `timestamp` is always a valid instant (current time substituted when
///   the source yields nothing usable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingInfo {
    /// Uppercase-normalized tracking number
    #[serde(rename = "trackingNumber")]
    pub tracking_number: String,

    /// Which carrier produced (or was simulated for) this record
    pub carrier: CarrierId,

    /// Normalized status of the most recent event
    pub status: TrackingStatus,

    /// Most recent known location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Time of the most recent known event
    pub timestamp: DateTime<Utc>,

    /// Human-readable summary of the current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// All known events, most recent first; never empty
    pub events: Vec<TrackingEvent>,
}

impl TrackingInfo {
    /// Build a record from an already-ordered (most-recent-first) event list
    ///
    /// The top-level status/location/timestamp/description mirror the most
    /// recent event. An empty event list yields a single synthesized event
    /// so the non-empty invariant holds on every path.
    pub fn from_events(
        tracking_number: impl Into<String>,
        carrier: CarrierId,
        status: TrackingStatus,
        mut events: Vec<TrackingEvent>,
    ) -> Self {
        if events.is_empty() {
            events.push(TrackingEvent::new(
                "Unknown",
                None,
                None,
                Some("No tracking information available".to_string()),
            ));
        }

        let latest = &events[0];
        Self {
            tracking_number: tracking_number.into(),
            carrier,
            status,
            location: latest.location.clone(),
            timestamp: latest.timestamp,
            description: latest.description.clone(),
            events,
        }
    }

    /// The generic synthetic record used when neither a live result nor
    /// mock data exists for a tracking number.
    pub fn unavailable(tracking_number: impl Into<String>, carrier: CarrierId) -> Self {
        let now = Utc::now();
        let tracking_number = tracking_number.into();
        Self {
            tracking_number,
            carrier,
            status: TrackingStatus::InTransit,
            location: Some("Unknown Location".to_string()),
            timestamp: now,
            description: Some("Package information not available".to_string()),
            events: vec![TrackingEvent {
                status: "In Transit".to_string(),
                location: Some("Unknown Location".to_string()),
                timestamp: now,
                description: Some("Package information not available".to_string()),
            }],
        }
    }
}
