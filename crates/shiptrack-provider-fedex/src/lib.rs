// # FedEx Tracking Provider
//
// FedEx Track API implementation for the ShipTrack system.
//
// ## Protocol
//
// - JSON request/response against the FedEx Track API
// - OAuth client-credentials flow against the token endpoint, performed
//   during `initialize()` before any tracking call
// - Events live at `output.completeTrackResults[0].trackResults[0].scanEvents[]`
// - Sandbox payloads frequently carry null scan timestamps; when an event
//   has no usable time, descending timestamps spaced a fixed interval apart
//   are synthesized so event ordering stays internally consistent. The
//   spacing is a data-quality compensation, not a claim about real times.
//
// ## Constraints
//
// - One live attempt per `track()` call; no retry logic (the resolver owns
//   the degradation policy)
// - Credentials and tokens never appear in logs

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use shiptrack_core::config::{CarrierConfig, CarrierCredentials};
use shiptrack_core::model::{CarrierId, TrackingEvent, TrackingInfo};
use shiptrack_core::provider::ProviderContext;
use shiptrack_core::traits::{CarrierProvider, CarrierProviderFactory};
use shiptrack_core::{Error, Result};

/// Hours between synthesized event timestamps (index 0 is "now")
const EVENT_SPACING_HOURS: i64 = 2;

/// FedEx tracking provider
pub struct FedexProvider {
    ctx: ProviderContext,
}

impl FedexProvider {
    /// Create a new FedEx provider from config and credentials
    pub fn new(config: CarrierConfig, credentials: CarrierCredentials) -> Self {
        Self {
            ctx: ProviderContext::new(CarrierId::Fedex, config, credentials),
        }
    }

    /// Normalize a FedEx track response payload
    fn parse_track_response(&self, tracking_number: &str, payload: &Value) -> Result<TrackingInfo> {
        let track_result = payload["output"]["completeTrackResults"]
            .as_array()
            .and_then(|results| results.first())
            .ok_or_else(|| Error::not_found(CarrierId::Fedex, tracking_number))?;

        let details = track_result["trackResults"]
            .as_array()
            .and_then(|results| results.first())
            .ok_or_else(|| {
                Error::invalid_response(CarrierId::Fedex, "track result carries no details")
            })?;

        let now = Utc::now();
        let events: Vec<TrackingEvent> = match details["scanEvents"].as_array() {
            Some(scan_events) => scan_events
                .iter()
                .enumerate()
                .map(|(index, event)| parse_scan_event(event, index, now))
                .collect(),
            None => vec![latest_status_event(details, now)],
        };

        let latest_status = events
            .first()
            .map(|event| event.status.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(TrackingInfo::from_events(
            tracking_number,
            CarrierId::Fedex,
            self.ctx.map_status(&latest_status),
            events,
        ))
    }
}

/// Normalize one `scanEvents[]` element
///
/// A scan without a usable `date` gets a synthesized timestamp descending
/// from `now` by [`EVENT_SPACING_HOURS`] per index, preserving the
/// most-recent-first ordering of the payload.
fn parse_scan_event(event: &Value, index: usize, now: DateTime<Utc>) -> TrackingEvent {
    let status = event["eventDescription"].as_str().unwrap_or("Unknown");

    let timestamp = event["date"]
        .as_str()
        .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_else(|| now - Duration::hours(EVENT_SPACING_HOURS * index as i64));

    TrackingEvent::new(
        status,
        scan_location(&event["scanLocation"]),
        Some(timestamp),
        event["eventDescription"].as_str().map(str::to_string),
    )
}

/// Single fallback event when the payload has no scan list at all
fn latest_status_event(details: &Value, now: DateTime<Utc>) -> TrackingEvent {
    let latest = &details["latestStatusDetail"];
    let status = latest["description"].as_str().unwrap_or("Unknown");

    TrackingEvent::new(
        status,
        scan_location(&latest["scanLocation"]),
        Some(now),
        Some(
            latest["description"]
                .as_str()
                .unwrap_or("Package tracked")
                .to_string(),
        ),
    )
}

/// "city, state" when both are present, bare city otherwise
fn scan_location(location: &Value) -> Option<String> {
    let city = location["city"].as_str()?;
    match location["stateOrProvinceCode"].as_str() {
        Some(state) => Some(format!("{city}, {state}")),
        None => Some(city.to_string()),
    }
}

#[async_trait]
impl CarrierProvider for FedexProvider {
    fn carrier(&self) -> CarrierId {
        CarrierId::Fedex
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
        tracing::debug!("FedEx track request for {tracking_number}");

        let body = json!({
            "includeDetailedScans": true,
            "trackingInfo": [{
                "trackingNumberInfo": { "trackingNumber": tracking_number }
            }],
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
                    CarrierId::Fedex,
                    format!("request rejected with status {status}"),
                ),
                404 => Error::not_found(CarrierId::Fedex, tracking_number),
                _ => Error::carrier_api(
                    CarrierId::Fedex,
                    format!("tracking request failed: {status} - {error_text}"),
                ),
            });
        }

        let payload: Value = response.json().await.map_err(|e| {
            Error::invalid_response(CarrierId::Fedex, format!("track response: {e}"))
        })?;

        self.parse_track_response(tracking_number, &payload)
    }
}

/// Factory for creating FedEx providers
pub struct FedexFactory;

impl CarrierProviderFactory for FedexFactory {
    fn create(
        &self,
        config: CarrierConfig,
        credentials: CarrierCredentials,
    ) -> Result<Box<dyn CarrierProvider>> {
        Ok(Box::new(FedexProvider::new(config, credentials)))
    }
}

/// Register the FedEx provider factory with a registry
pub fn register(registry: &shiptrack_core::CarrierRegistry) {
    registry.register_factory(CarrierId::Fedex, std::sync::Arc::new(FedexFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiptrack_core::model::TrackingStatus;

    fn provider() -> FedexProvider {
        FedexProvider::new(
            CarrierConfig::builtin(CarrierId::Fedex),
            CarrierCredentials::default(),
        )
    }

    fn payload_with_scan_events(events: Value) -> Value {
        json!({
            "output": {
                "completeTrackResults": [{
                    "trackResults": [{
                        "latestStatusDetail": {
                            "description": "On FedEx vehicle for delivery",
                            "scanLocation": { "city": "Seattle", "stateOrProvinceCode": "WA" }
                        },
                        "scanEvents": events
                    }]
                }]
            }
        })
    }

    #[test]
    fn test_synthesizes_descending_timestamps() {
        // Sandbox-style payload: no usable dates anywhere
        let payload = payload_with_scan_events(json!([
            { "eventDescription": "On FedEx vehicle for delivery", "date": null },
            { "eventDescription": "At local FedEx facility" },
            { "eventDescription": "Picked up" }
        ]));

        let info = provider()
            .parse_track_response("123456789012", &payload)
            .unwrap();

        assert_eq!(info.events.len(), 3);
        let gap = info.events[0].timestamp - info.events[1].timestamp;
        assert_eq!(gap, Duration::hours(EVENT_SPACING_HOURS));
        for pair in info.events.windows(2) {
            assert!(pair[0].timestamp > pair[1].timestamp);
        }
        assert_eq!(info.status, TrackingStatus::OutForDelivery);
    }

    #[test]
    fn test_prefers_carrier_timestamps_when_usable() {
        let payload = payload_with_scan_events(json!([
            { "eventDescription": "Delivered", "date": "2025-03-12T14:30:00Z" }
        ]));

        let info = provider()
            .parse_track_response("123456789012", &payload)
            .unwrap();

        let expected = DateTime::parse_from_rfc3339("2025-03-12T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(info.events[0].timestamp, expected);
        assert_eq!(info.status, TrackingStatus::Delivered);
    }

    #[test]
    fn test_missing_scan_events_uses_latest_status_detail() {
        let payload = json!({
            "output": {
                "completeTrackResults": [{
                    "trackResults": [{
                        "latestStatusDetail": {
                            "description": "Shipment information sent to FedEx",
                            "scanLocation": { "city": "Memphis", "stateOrProvinceCode": "TN" }
                        }
                    }]
                }]
            }
        });

        let info = provider()
            .parse_track_response("123456789012", &payload)
            .unwrap();

        assert_eq!(info.events.len(), 1);
        assert_eq!(info.events[0].location.as_deref(), Some("Memphis, TN"));
        assert_eq!(info.status, TrackingStatus::Pending);
    }

    #[test]
    fn test_empty_results_is_not_found() {
        let payload = json!({ "output": { "completeTrackResults": [] } });
        let err = provider()
            .parse_track_response("123456789012", &payload)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_scan_location_shapes() {
        assert_eq!(
            scan_location(&json!({ "city": "Austin", "stateOrProvinceCode": "TX" })),
            Some("Austin, TX".to_string())
        );
        assert_eq!(
            scan_location(&json!({ "city": "Austin" })),
            Some("Austin".to_string())
        );
        assert_eq!(scan_location(&json!({})), None);
    }

    #[test]
    fn test_factory_creates_provider() {
        let provider = FedexFactory
            .create(
                CarrierConfig::builtin(CarrierId::Fedex),
                CarrierCredentials::default(),
            )
            .unwrap();

        assert_eq!(provider.carrier(), CarrierId::Fedex);
        assert!(!provider.is_available());
        assert!(provider.mock_data("123456789012").is_some());
    }
}
