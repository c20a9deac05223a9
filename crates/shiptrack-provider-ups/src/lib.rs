// # UPS Tracking Provider
//
// UPS Track API implementation for the ShipTrack system.
//
// ## Protocol
//
// - JSON request/response against the UPS Track API
// - OAuth client-credentials auth, token acquired during `initialize()`
// - Events live at `trackResponse.shipment[0].package[0].activity[]`
// - Event timestamps combine separate `date` and `time` payload fields
// - Location is "city, state" only when both structured fields are present
//
// ## Constraints
//
// - One live attempt per `track()` call; no retry logic (the resolver owns
//   the degradation policy)
// - No caching of tracking results
// - Credentials never appear in logs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Value, json};
use shiptrack_core::config::{CarrierConfig, CarrierCredentials};
use shiptrack_core::model::{CarrierId, TrackingEvent, TrackingInfo};
use shiptrack_core::provider::ProviderContext;
use shiptrack_core::traits::{CarrierProvider, CarrierProviderFactory};
use shiptrack_core::{Error, Result};

/// UPS tracking provider
pub struct UpsProvider {
    ctx: ProviderContext,
}

impl UpsProvider {
    /// Create a new UPS provider from config and credentials
    pub fn new(config: CarrierConfig, credentials: CarrierCredentials) -> Self {
        Self {
            ctx: ProviderContext::new(CarrierId::Ups, config, credentials),
        }
    }

    /// Normalize a UPS track response payload
    fn parse_track_response(&self, tracking_number: &str, payload: &Value) -> Result<TrackingInfo> {
        let shipment = payload["trackResponse"]["shipment"]
            .as_array()
            .and_then(|shipments| shipments.first())
            .ok_or_else(|| Error::not_found(CarrierId::Ups, tracking_number))?;

        let package = shipment["package"]
            .as_array()
            .and_then(|packages| packages.first())
            .ok_or_else(|| {
                Error::invalid_response(CarrierId::Ups, "shipment carries no package element")
            })?;

        let events: Vec<TrackingEvent> = package["activity"]
            .as_array()
            .map(|activity| activity.iter().map(parse_activity_event).collect())
            .unwrap_or_default();

        let latest_status = events
            .first()
            .map(|event| event.status.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(TrackingInfo::from_events(
            tracking_number,
            CarrierId::Ups,
            self.ctx.map_status(&latest_status),
            events,
        ))
    }
}

/// Normalize one `activity[]` element
fn parse_activity_event(activity: &Value) -> TrackingEvent {
    let status = activity["status"]["description"]
        .as_str()
        .or_else(|| activity["status"]["type"].as_str())
        .unwrap_or("Unknown");

    let address = &activity["location"]["address"];
    let location = match (address["city"].as_str(), address["stateProvinceCode"].as_str()) {
        (Some(city), Some(state)) => Some(format!("{city}, {state}")),
        _ => None,
    };

    let timestamp = match (activity["date"].as_str(), activity["time"].as_str()) {
        (Some(date), Some(time)) => combine_date_time(date, time),
        _ => None,
    };

    TrackingEvent::new(
        status,
        location,
        timestamp,
        activity["status"]["description"]
            .as_str()
            .or_else(|| activity["status"]["type"].as_str())
            .map(str::to_string),
    )
}

/// Combine the separate UPS `date` and `time` fields into one instant
///
/// UPS sends compact `YYYYMMDD`/`HHMMSS` values; dashed/colon forms are
/// accepted too. Unusable values yield `None`, which the event constructor
/// substitutes with the current time.
fn combine_date_time(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let joined = format!("{date} {time}");

    for format in ["%Y%m%d %H%M%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&joined, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

#[async_trait]
impl CarrierProvider for UpsProvider {
    fn carrier(&self) -> CarrierId {
        CarrierId::Ups
    }

    fn config(&self) -> &CarrierConfig {
        self.ctx.config()
    }

    async fn initialize(&self) -> Result<()> {
        self.ctx.initialize().await
    }

    fn is_available(&self) -> bool {
        self.ctx.is_available()
    }

    fn mock_data(&self, tracking_number: &str) -> Option<TrackingInfo> {
        self.ctx.mock_data(tracking_number)
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        tracing::debug!("UPS track request for {tracking_number}");

        let body = json!({
            "inquiryNumber": tracking_number,
            "locale": "en_US",
            "returnSignature": false,
            "returnMilestones": true,
            "returnPOD": false,
        });

        let request = self
            .ctx
            .post(&self.ctx.config().endpoints.track)
            .json(&body);
        let response = self.ctx.execute(request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::auth(
                    CarrierId::Ups,
                    format!("request rejected with status {status}"),
                ),
                404 => Error::not_found(CarrierId::Ups, tracking_number),
                _ => Error::carrier_api(
                    CarrierId::Ups,
                    format!("tracking request failed: {status} - {error_text}"),
                ),
            });
        }

        let payload: Value = response.json().await.map_err(|e| {
            Error::invalid_response(CarrierId::Ups, format!("track response: {e}"))
        })?;

        self.parse_track_response(tracking_number, &payload)
    }
}

/// Factory for creating UPS providers
pub struct UpsFactory;

impl CarrierProviderFactory for UpsFactory {
    fn create(
        &self,
        config: CarrierConfig,
        credentials: CarrierCredentials,
    ) -> Result<Box<dyn CarrierProvider>> {
        Ok(Box::new(UpsProvider::new(config, credentials)))
    }
}

/// Register the UPS provider factory with a registry
pub fn register(registry: &shiptrack_core::CarrierRegistry) {
    registry.register_factory(CarrierId::Ups, std::sync::Arc::new(UpsFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiptrack_core::model::TrackingStatus;

    fn provider() -> UpsProvider {
        UpsProvider::new(
            CarrierConfig::builtin(CarrierId::Ups),
            CarrierCredentials::default(),
        )
    }

    fn sample_payload() -> Value {
        json!({
            "trackResponse": {
                "shipment": [{
                    "package": [{
                        "activity": [
                            {
                                "status": { "description": "Out For Delivery", "type": "I" },
                                "location": { "address": { "city": "Portland", "stateProvinceCode": "OR" } },
                                "date": "20250312",
                                "time": "084500"
                            },
                            {
                                "status": { "type": "P" },
                                "location": { "address": { "city": "Louisville" } },
                                "date": "20250311",
                                "time": "221304"
                            }
                        ]
                    }]
                }]
            }
        })
    }

    #[test]
    fn test_parses_nested_activity() {
        let info = provider()
            .parse_track_response("1Z999AA1234567890", &sample_payload())
            .unwrap();

        assert_eq!(info.carrier, CarrierId::Ups);
        assert_eq!(info.status, TrackingStatus::OutForDelivery);
        assert_eq!(info.events.len(), 2);
        assert_eq!(info.events[0].location.as_deref(), Some("Portland, OR"));
        assert_eq!(
            info.events[0].timestamp,
            combine_date_time("20250312", "084500").unwrap()
        );
    }

    #[test]
    fn test_location_requires_both_fields() {
        let info = provider()
            .parse_track_response("1Z999AA1234567890", &sample_payload())
            .unwrap();

        // Second event has a city but no state code
        assert_eq!(info.events[1].location, None);
        // Falls back to the status type code when description is absent
        assert_eq!(info.events[1].status, "P");
    }

    #[test]
    fn test_missing_shipment_is_not_found() {
        let payload = json!({ "trackResponse": { "shipment": [] } });
        let err = provider()
            .parse_track_response("1Z999AA1234567890", &payload)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_empty_activity_still_yields_an_event() {
        let payload = json!({
            "trackResponse": { "shipment": [{ "package": [{}] }] }
        });

        let info = provider()
            .parse_track_response("1Z999AA1234567890", &payload)
            .unwrap();
        assert_eq!(info.events.len(), 1);
        assert_eq!(info.status, TrackingStatus::Unknown);
    }

    #[test]
    fn test_combine_date_time_formats() {
        assert!(combine_date_time("20250312", "084500").is_some());
        assert!(combine_date_time("2025-03-12", "08:45:00").is_some());
        assert!(combine_date_time("March 12", "morning").is_none());
    }

    #[test]
    fn test_unusable_timestamp_substituted() {
        let payload = json!({
            "trackResponse": {
                "shipment": [{
                    "package": [{
                        "activity": [{
                            "status": { "description": "In Transit" },
                            "date": "soon",
                            "time": "later"
                        }]
                    }]
                }]
            }
        });

        let info = provider()
            .parse_track_response("1Z999AA1234567890", &payload)
            .unwrap();
        assert!(info.events[0].timestamp <= Utc::now());
    }

    #[test]
    fn test_factory_creates_provider() {
        let provider = UpsFactory
            .create(
                CarrierConfig::builtin(CarrierId::Ups),
                CarrierCredentials::default(),
            )
            .unwrap();

        assert_eq!(provider.carrier(), CarrierId::Ups);
        // OAuth carrier without credentials is degraded, not broken
        assert!(!provider.is_available());
        assert!(provider.mock_data("1Z999AA1234567890").is_some());
    }
}
