// # USPS Tracking Provider
//
// USPS Web Tools (TrackV2) implementation for the ShipTrack system.
//
// ## Protocol
//
// - XML request/response, not JSON: a hand-composed `TrackFieldRequest`
//   document is form-posted as `API=TrackV2&XML=...`
// - No auth header; the Web Tools user id travels inside the XML body,
//   so `is_available` requires `user_id` rather than the default
//   auth-type check
// - Carrier errors are detected by scanning for an `<Error>` marker and
//   extracting the `<Description>` field by pattern; no XML schema
//   validation is performed
// - Geographic/eligibility refusals surface as a distinguished error
//   category: the public Web Tools API has known regional availability
//   restrictions
// - Events are parsed from repeated `<TrackDetail>` blocks via text-pattern
//   extraction

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use shiptrack_core::config::{CarrierConfig, CarrierCredentials};
use shiptrack_core::model::{CarrierId, TrackingEvent, TrackingInfo};
use shiptrack_core::provider::ProviderContext;
use shiptrack_core::traits::{CarrierProvider, CarrierProviderFactory};
use shiptrack_core::{Error, Result};
use std::sync::LazyLock;

static ERROR_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Description[^>]*>([^<]*)</Description>").unwrap());
static TRACK_INFO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<TrackInfo[^>]*>(.*?)</TrackInfo>").unwrap());
static TRACK_DETAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<TrackDetail[^>]*>(.*?)</TrackDetail>").unwrap());
static EVENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Event[^>]*>([^<]*)</Event>").unwrap());
static EVENT_CITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<EventCity[^>]*>([^<]*)</EventCity>").unwrap());
static EVENT_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<EventState[^>]*>([^<]*)</EventState>").unwrap());
static EVENT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<EventDate[^>]*>([^<]*)</EventDate>").unwrap());
static EVENT_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<EventTime[^>]*>([^<]*)</EventTime>").unwrap());

/// USPS tracking provider
pub struct UspsProvider {
    ctx: ProviderContext,
}

impl UspsProvider {
    /// Create a new USPS provider from config and credentials
    pub fn new(config: CarrierConfig, credentials: CarrierCredentials) -> Self {
        Self {
            ctx: ProviderContext::new(CarrierId::Usps, config, credentials),
        }
    }

    /// Compose the TrackFieldRequest document
    fn build_request_xml(&self, tracking_number: &str) -> Result<String> {
        let user_id = self
            .ctx
            .credentials()
            .user_id
            .as_deref()
            .ok_or_else(|| Error::auth(CarrierId::Usps, "Web Tools user id not configured"))?;

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<TrackFieldRequest USERID="{user_id}">
  <Revision>1</Revision>
  <ClientIp>127.0.0.1</ClientIp>
  <SourceId>ShipTrack</SourceId>
  <TrackID ID="{tracking_number}"></TrackID>
</TrackFieldRequest>"#
        ))
    }

    /// Normalize a TrackV2 response document
    fn parse_track_response(&self, tracking_number: &str, xml: &str) -> Result<TrackingInfo> {
        if xml.contains("<Error>") {
            let message = ERROR_DESCRIPTION
                .captures(xml)
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| "Unknown error".to_string());

            return Err(if is_geographic_restriction(&message) {
                Error::geographic(CarrierId::Usps, message)
            } else {
                Error::carrier_api(CarrierId::Usps, format!("tracking error: {message}"))
            });
        }

        let events = TRACK_INFO
            .captures(xml)
            .and_then(|captures| captures.get(1))
            .map(|track_info| parse_detail_events(track_info.as_str()))
            .unwrap_or_default();

        let latest_status = events
            .first()
            .map(|event| event.status.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(TrackingInfo::from_events(
            tracking_number,
            CarrierId::Usps,
            self.ctx.map_status(&latest_status),
            events,
        ))
    }
}

/// Extract ordered events from the repeated TrackDetail blocks
fn parse_detail_events(track_info: &str) -> Vec<TrackingEvent> {
    TRACK_DETAIL
        .captures_iter(track_info)
        .filter_map(|captures| {
            let detail = captures.get(1)?.as_str();
            let status = extract(&EVENT, detail)?;

            let location = match (extract(&EVENT_CITY, detail), extract(&EVENT_STATE, detail)) {
                (Some(city), Some(state)) => Some(format!("{city}, {state}")),
                _ => None,
            };

            let timestamp = match (extract(&EVENT_DATE, detail), extract(&EVENT_TIME, detail)) {
                (Some(date), Some(time)) => parse_event_time(&date, &time),
                _ => None,
            };

            Some(TrackingEvent::new(
                status.clone(),
                location,
                timestamp,
                Some(status),
            ))
        })
        .collect()
}

/// First capture of a field pattern, trimmed, empty treated as absent
fn extract(pattern: &Regex, detail: &str) -> Option<String> {
    pattern
        .captures(detail)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse the USPS long-form date plus clock time ("March 12, 2025" +
/// "8:45 am"); unusable values yield `None` and the event constructor
/// substitutes the current time.
fn parse_event_time(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let joined = format!("{date} {}", time.to_uppercase());

    for format in ["%B %d, %Y %I:%M %p", "%B %d, %Y %I:%M:%S %p"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&joined, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Whether a carrier error message describes a regional-availability refusal
fn is_geographic_restriction(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not eligible") || lower.contains("geographic") || lower.contains("location")
}

#[async_trait]
impl CarrierProvider for UspsProvider {
    fn carrier(&self) -> CarrierId {
        CarrierId::Usps
    }

    fn config(&self) -> &CarrierConfig {
        self.ctx.config()
    }

    async fn initialize(&self) -> Result<()> {
        self.ctx.initialize().await
    }

    /// The Web Tools user id rides in the XML body, so the default
    /// auth-type availability check is not enough here.
    fn is_available(&self) -> bool {
        self.ctx
            .credentials()
            .user_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }

    fn mock_data(&self, tracking_number: &str) -> Option<TrackingInfo> {
        self.ctx.mock_data(tracking_number)
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        tracing::debug!("USPS track request for {tracking_number}");

        let xml = self.build_request_xml(tracking_number)?;
        let request = self
            .ctx
            .post(&self.ctx.config().endpoints.track)
            .form(&[("API", "TrackV2"), ("XML", xml.as_str())]);
        let response = self.ctx.execute(request).await?;

        if !response.status().is_success() {
            let status = response.status();

            return Err(match status.as_u16() {
                403 => Error::geographic(
                    CarrierId::Usps,
                    "access denied; the Web Tools API is primarily available \
                     for US-based users",
                ),
                429 => Error::carrier_api(
                    CarrierId::Usps,
                    "API temporarily unavailable, retry later",
                ),
                _ => Error::carrier_api(
                    CarrierId::Usps,
                    format!("tracking request failed: {status}"),
                ),
            });
        }

        let body = response.text().await.map_err(|e| {
            Error::invalid_response(CarrierId::Usps, format!("track response: {e}"))
        })?;

        self.parse_track_response(tracking_number, &body)
    }
}

/// Factory for creating USPS providers
pub struct UspsFactory;

impl CarrierProviderFactory for UspsFactory {
    fn create(
        &self,
        config: CarrierConfig,
        credentials: CarrierCredentials,
    ) -> Result<Box<dyn CarrierProvider>> {
        Ok(Box::new(UspsProvider::new(config, credentials)))
    }
}

/// Register the USPS provider factory with a registry
pub fn register(registry: &shiptrack_core::CarrierRegistry) {
    registry.register_factory(CarrierId::Usps, std::sync::Arc::new(UspsFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiptrack_core::model::TrackingStatus;

    fn provider_with_user(user_id: Option<&str>) -> UspsProvider {
        UspsProvider::new(
            CarrierConfig::builtin(CarrierId::Usps),
            CarrierCredentials {
                user_id: user_id.map(str::to_string),
                ..CarrierCredentials::default()
            },
        )
    }

    const SAMPLE_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrackResponse>
  <TrackInfo ID="9400100000000000000000">
    <TrackSummary>Your item was delivered.</TrackSummary>
    <TrackDetail>
      <Event>Delivered</Event>
      <EventCity>Chicago</EventCity>
      <EventState>IL</EventState>
      <EventDate>March 12, 2025</EventDate>
      <EventTime>10:45 am</EventTime>
    </TrackDetail>
    <TrackDetail>
      <Event>Out for Delivery</Event>
      <EventCity>Chicago</EventCity>
      <EventState>IL</EventState>
      <EventDate>March 12, 2025</EventDate>
      <EventTime>8:12 am</EventTime>
    </TrackDetail>
    <TrackDetail>
      <Event>Arrived at Post Office</Event>
      <EventCity>Chicago</EventCity>
      <EventState>IL</EventState>
      <EventDate>March 11, 2025</EventDate>
      <EventTime>11:03 pm</EventTime>
    </TrackDetail>
  </TrackInfo>
</TrackResponse>"#;

    #[test]
    fn test_availability_requires_user_id() {
        assert!(provider_with_user(Some("SHIPTRACK01")).is_available());
        assert!(!provider_with_user(Some("")).is_available());
        assert!(!provider_with_user(None).is_available());
    }

    #[test]
    fn test_request_xml_carries_user_id_and_number() {
        let xml = provider_with_user(Some("SHIPTRACK01"))
            .build_request_xml("9400100000000000000000")
            .unwrap();

        assert!(xml.contains(r#"USERID="SHIPTRACK01""#));
        assert!(xml.contains(r#"<TrackID ID="9400100000000000000000">"#));
        assert!(xml.contains("<SourceId>ShipTrack</SourceId>"));
    }

    #[test]
    fn test_request_xml_without_user_id_fails() {
        let err = provider_with_user(None)
            .build_request_xml("9400100000000000000000")
            .unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn test_parses_repeated_detail_blocks() {
        let info = provider_with_user(Some("SHIPTRACK01"))
            .parse_track_response("9400100000000000000000", SAMPLE_RESPONSE)
            .unwrap();

        assert_eq!(info.status, TrackingStatus::Delivered);
        assert_eq!(info.events.len(), 3);
        assert_eq!(info.events[0].location.as_deref(), Some("Chicago, IL"));
        assert_eq!(info.events[2].status, "Arrived at Post Office");

        // Timestamps come from the document, most recent first
        for pair in info.events.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
        assert_eq!(
            info.events[0].timestamp,
            parse_event_time("March 12, 2025", "10:45 am").unwrap()
        );
    }

    #[test]
    fn test_empty_track_info_yields_single_event() {
        let xml = "<TrackResponse><TrackInfo ID=\"94001\"></TrackInfo></TrackResponse>";
        let info = provider_with_user(Some("SHIPTRACK01"))
            .parse_track_response("9400100000000000000000", xml)
            .unwrap();

        assert_eq!(info.events.len(), 1);
        assert_eq!(info.status, TrackingStatus::Unknown);
    }

    #[test]
    fn test_error_marker_extracted() {
        let xml = r#"<Error><Number>-2147219283</Number>
            <Description>A status update is not yet available.</Description></Error>"#;

        let err = provider_with_user(Some("SHIPTRACK01"))
            .parse_track_response("9400100000000000000000", xml)
            .unwrap_err();

        match err {
            Error::CarrierApi { message, .. } => {
                assert!(message.contains("status update is not yet available"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_geographic_errors_are_distinguished() {
        let xml = r#"<Error><Description>This service is not eligible in your
            location.</Description></Error>"#;

        let err = provider_with_user(Some("SHIPTRACK01"))
            .parse_track_response("9400100000000000000000", xml)
            .unwrap_err();
        assert!(matches!(err, Error::GeographicRestriction { .. }));
    }

    #[test]
    fn test_geographic_classification() {
        assert!(is_geographic_restriction("Not Eligible for this product"));
        assert!(is_geographic_restriction("GEOGRAPHIC restriction applies"));
        assert!(!is_geographic_restriction("Invalid XML"));
    }

    #[test]
    fn test_event_time_formats() {
        assert!(parse_event_time("March 12, 2025", "10:45 am").is_some());
        assert!(parse_event_time("March 12, 2025", "11:03 PM").is_some());
        assert!(parse_event_time("yesterday", "late").is_none());
    }

    #[test]
    fn test_factory_creates_provider() {
        let provider = UspsFactory
            .create(
                CarrierConfig::builtin(CarrierId::Usps),
                CarrierCredentials::default(),
            )
            .unwrap();

        assert_eq!(provider.carrier(), CarrierId::Usps);
        assert!(!provider.is_available());
        assert!(provider.mock_data("9400100000000000000000").is_some());
    }
}
