//! Tracking resolution orchestrator
//!
//! The resolver is the single public entry point combining carrier
//! detection, provider selection, and the degradation policy:
//!
//! ```text
//! raw string
//!    │ normalize + detect
//!    ▼
//! CarrierRegistry.get(carrier)
//!    │
//!    ▼
//! provider.is_available() ──false──▶ mock ──none──▶ synthetic
//!    │ true
//!    ▼
//! provider.track() ──error──▶ mock ──none──▶ synthetic
//!    │ ok
//!    ▼
//! normalized TrackingInfo
//! ```
//!
//! Carrier-level failures never reach the caller; only the structural
//! conditions (unrecognized format, missing provider) surface as errors.

use crate::detect::detect_carrier;
use crate::error::{Error, Result};
use crate::model::TrackingInfo;
use crate::registry::CarrierRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Detection → provider → degradation orchestrator
pub struct TrackingResolver {
    registry: Arc<CarrierRegistry>,
}

impl TrackingResolver {
    /// Create a resolver backed by a registry
    pub fn new(registry: Arc<CarrierRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve a raw tracking number into one normalized record
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCarrier`] when the input matches no known
    ///   carrier format
    /// - [`Error::ProviderNotFound`] when the registry has no entry for a
    ///   detected carrier (defensive; the registry guarantees make this
    ///   unreachable)
    ///
    /// Live-call failures and missing credentials degrade to mock data,
    /// then to a generic synthetic record; they are never surfaced.
    pub async fn track(&self, raw_tracking_number: &str) -> Result<TrackingInfo> {
        let number = raw_tracking_number.trim().to_uppercase();

        let carrier = detect_carrier(&number)
            .ok_or_else(|| Error::UnsupportedCarrier(number.clone()))?;
        debug!("Detected carrier {carrier} for {number}");

        let provider = self
            .registry
            .get(carrier)
            .await
            .ok_or(Error::ProviderNotFound(carrier))?;

        if provider.is_available() {
            match provider.track(&number).await {
                Ok(info) => return Ok(info),
                Err(e) => {
                    warn!("{carrier} live tracking failed for {number}: {e}; \
                        falling back to mock data");
                }
            }
        } else {
            debug!("{carrier} credentials absent; skipping live call for {number}");
        }

        if let Some(info) = provider.mock_data(&number) {
            return Ok(info);
        }

        debug!("No mock record for {number}; returning synthetic record");
        Ok(TrackingInfo::unavailable(number, carrier))
    }

    /// All carriers the resolver can currently serve
    pub async fn supported_carriers(&self) -> Vec<crate::model::CarrierId> {
        self.registry.initialize().await;
        self.registry.supported_carriers()
    }
}
