// # Carrier Provider Trait
//
// Defines the interface for carrier tracking adapters.
//
// ## Implementations
//
// - UPS: `shiptrack-provider-ups` crate
// - FedEx: `shiptrack-provider-fedex` crate
// - USPS: `shiptrack-provider-usps` crate
// - Mock fallback: `shiptrack_core::provider::MockCarrierProvider`
//
// ## Trust Level
//
// Providers are isolated integrations with strict limitations:
//
// - Perform HTTP/HTTPS calls to their carrier's endpoints only
// - Parse carrier-specific responses into the normalized model
// - Return success or failure (the resolver owns the degradation policy)
// - No retry logic (single live attempt; fallback is owned by `TrackingResolver`)
// - No caching of tracking results (owned by the history/caching collaborators)
// - No knowledge of other providers or of registry state

use crate::config::{CarrierConfig, CarrierCredentials};
use crate::model::{CarrierId, TrackingInfo};
use async_trait::async_trait;

/// Trait for carrier tracking implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait CarrierProvider: Send + Sync {
    /// The carrier this provider serves
    fn carrier(&self) -> CarrierId;

    /// The provider's static configuration
    fn config(&self) -> &CarrierConfig;

    /// Perform one-time setup needed before live calls can succeed
    ///
    /// For OAuth carriers this acquires the bearer token. Called once per
    /// provider lifetime by the registry; a failure here is non-fatal to
    /// registry startup (the registry substitutes a mock provider).
    async fn initialize(&self) -> crate::Result<()>;

    /// Whether this provider can make live calls
    ///
    /// Pure function of the configured credentials and auth type; never
    /// performs network I/O. When this returns `false` the resolver skips
    /// the live call entirely and degrades to mock/synthetic data.
    fn is_available(&self) -> bool;

    /// Look up a canned record by exact normalized tracking number
    ///
    /// Timestamps are stamped at lookup time, so repeated calls yield
    /// fresh-looking records.
    fn mock_data(&self, tracking_number: &str) -> Option<TrackingInfo>;

    /// Fetch and normalize live tracking data
    ///
    /// # Errors
    ///
    /// Fails with a carrier-level [`crate::Error`] when the HTTP call
    /// errors or times out, the carrier reports the number as unknown, or
    /// the response shape is unparseable. Never returns a `TrackingInfo`
    /// with empty `events`.
    async fn track(&self, tracking_number: &str) -> crate::Result<TrackingInfo>;
}

/// Helper trait for constructing carrier providers from configuration
///
/// Provider crates register a factory with the [`crate::CarrierRegistry`];
/// the registry drives construction during its guarded initialization pass.
pub trait CarrierProviderFactory: Send + Sync {
    /// Create a provider instance from configuration and credentials
    fn create(
        &self,
        config: CarrierConfig,
        credentials: CarrierCredentials,
    ) -> crate::Result<Box<dyn CarrierProvider>>;
}
