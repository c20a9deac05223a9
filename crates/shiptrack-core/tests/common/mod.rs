//! Test doubles and common utilities for contract tests
//!
//! These doubles verify the registry and resolver contracts (exactly-once
//! initialization, no-network-when-unavailable, fallback ordering) without
//! any real carrier traffic.

use async_trait::async_trait;
use chrono::Utc;
use shiptrack_core::config::{CarrierConfig, CarrierCredentials};
use shiptrack_core::error::{Error, Result};
use shiptrack_core::model::{CarrierId, TrackingEvent, TrackingInfo, TrackingStatus};
use shiptrack_core::traits::{CarrierProvider, CarrierProviderFactory};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a [`ControlledProvider`]'s `track` call does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Return a live-looking record
    Live,
    /// Fail with a timeout error
    Timeout,
    /// Fail with a carrier not-found error
    NotFound,
}

/// A provider double with scripted availability and track behavior
pub struct ControlledProvider {
    carrier: CarrierId,
    config: CarrierConfig,
    available: bool,
    outcome: TrackOutcome,
    track_call_count: Arc<AtomicUsize>,
}

impl ControlledProvider {
    pub fn new(carrier: CarrierId, available: bool, outcome: TrackOutcome) -> Self {
        Self {
            carrier,
            config: CarrierConfig::builtin(carrier),
            available,
            outcome,
            track_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the track-call counter, usable after the provider has
    /// been moved into the registry
    pub fn track_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.track_call_count)
    }

    /// A recognizable live record, distinct from any mock table entry
    pub fn live_record(carrier: CarrierId, tracking_number: &str) -> TrackingInfo {
        TrackingInfo::from_events(
            tracking_number,
            carrier,
            TrackingStatus::InTransit,
            vec![TrackingEvent::new(
                "Departed",
                Some("Live Facility, TX".to_string()),
                Some(Utc::now()),
                Some("live carrier response".to_string()),
            )],
        )
    }
}

#[async_trait]
impl CarrierProvider for ControlledProvider {
    fn carrier(&self) -> CarrierId {
        self.carrier
    }

    fn config(&self) -> &CarrierConfig {
        &self.config
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn mock_data(&self, tracking_number: &str) -> Option<TrackingInfo> {
        self.config
            .mock_record(tracking_number)
            .map(|record| record.materialize(tracking_number, self.carrier))
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        self.track_call_count.fetch_add(1, Ordering::SeqCst);

        match self.outcome {
            TrackOutcome::Live => Ok(Self::live_record(self.carrier, tracking_number)),
            TrackOutcome::Timeout => Err(Error::timeout(self.carrier, 10)),
            TrackOutcome::NotFound => Err(Error::not_found(self.carrier, tracking_number)),
        }
    }
}

/// A factory that counts how many times `create` runs
pub struct CountingFactory {
    carrier: CarrierId,
    create_call_count: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn new(carrier: CarrierId) -> Self {
        Self {
            carrier,
            create_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn create_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.create_call_count)
    }
}

impl CarrierProviderFactory for CountingFactory {
    fn create(
        &self,
        _config: CarrierConfig,
        _credentials: CarrierCredentials,
    ) -> Result<Box<dyn CarrierProvider>> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ControlledProvider::new(
            self.carrier,
            true,
            TrackOutcome::Live,
        )))
    }
}

/// A factory whose `create` always fails
pub struct FailingFactory;

impl CarrierProviderFactory for FailingFactory {
    fn create(
        &self,
        config: CarrierConfig,
        _credentials: CarrierCredentials,
    ) -> Result<Box<dyn CarrierProvider>> {
        Err(Error::config(format!(
            "{} factory configured to fail",
            config.name
        )))
    }
}

/// A provider whose `initialize` fails (e.g. an OAuth handshake rejection)
pub struct InitFailingProvider {
    carrier: CarrierId,
    config: CarrierConfig,
}

impl InitFailingProvider {
    pub fn new(carrier: CarrierId) -> Self {
        Self {
            carrier,
            config: CarrierConfig::builtin(carrier),
        }
    }
}

#[async_trait]
impl CarrierProvider for InitFailingProvider {
    fn carrier(&self) -> CarrierId {
        self.carrier
    }

    fn config(&self) -> &CarrierConfig {
        &self.config
    }

    async fn initialize(&self) -> Result<()> {
        Err(Error::auth(self.carrier, "token endpoint rejected credentials"))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn mock_data(&self, _tracking_number: &str) -> Option<TrackingInfo> {
        None
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo> {
        Err(Error::carrier_api(
            self.carrier,
            format!("track called on uninitialized provider for {tracking_number}"),
        ))
    }
}

/// A factory producing providers that fail initialization
pub struct InitFailingFactory {
    carrier: CarrierId,
}

impl InitFailingFactory {
    pub fn new(carrier: CarrierId) -> Self {
        Self { carrier }
    }
}

impl CarrierProviderFactory for InitFailingFactory {
    fn create(
        &self,
        _config: CarrierConfig,
        _credentials: CarrierCredentials,
    ) -> Result<Box<dyn CarrierProvider>> {
        Ok(Box::new(InitFailingProvider::new(self.carrier)))
    }
}
