//! Carrier provider registry
//!
//! The registry owns the set of active providers, one per supported
//! carrier, and is the single source of truth for "is carrier X supported
//! right now". Provider crates register factories at startup; the registry
//! drives construction during a lazy, guarded initialization pass.
//!
//! ## Initialization
//!
//! `Uninitialized -> Initializing -> Ready`, with no way back. The guard is
//! a `tokio::sync::OnceCell`: exactly one configuration-load-and-provider-
//! construction pass runs even under concurrent first use, and every other
//! caller awaits the in-flight pass instead of re-running it.
//!
//! ## Fallback guarantee
//!
//! A real provider that fails construction or initialization is replaced by
//! a [`MockCarrierProvider`] for the same carrier, so the supported-carrier
//! set never shrinks because optional credentials are absent.

use crate::config::{CarrierConfig, CarrierCredentials};
use crate::model::CarrierId;
use crate::provider::MockCarrierProvider;
use crate::traits::{CarrierProvider, CarrierProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Process-wide catalog of carrier providers
///
/// ## Thread Safety
///
/// Interior mutability via `RwLock`; no lock is held across a suspension
/// point. The `OnceCell` guard serializes initialization.
#[derive(Default)]
pub struct CarrierRegistry {
    /// Registered provider factories, by carrier
    factories: RwLock<HashMap<CarrierId, Arc<dyn CarrierProviderFactory>>>,

    /// Active providers, exactly one per supported carrier once Ready
    providers: RwLock<HashMap<CarrierId, Arc<dyn CarrierProvider>>>,

    /// Loaded carrier configurations
    configs: RwLock<HashMap<CarrierId, CarrierConfig>>,

    /// One-shot initialization guard
    init: OnceCell<()>,
}

impl CarrierRegistry {
    /// Create a new registry with no factories registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory for a carrier
    ///
    /// Provider crates call this before first use; the factory is consulted
    /// during the initialization pass. A carrier without a factory still
    /// ends up supported via the mock fallback.
    pub fn register_factory(&self, id: CarrierId, factory: Arc<dyn CarrierProviderFactory>) {
        let mut factories = self.factories.write().unwrap();
        factories.insert(id, factory);
    }

    /// Insert or overwrite the active provider for a carrier
    pub fn register(&self, id: CarrierId, provider: Arc<dyn CarrierProvider>) {
        let mut providers = self.providers.write().unwrap();
        providers.insert(id, provider);
        debug!("Registered carrier provider: {id}");
    }

    /// Run the initialization pass if it has not run yet
    ///
    /// Idempotent and concurrency-safe: concurrent callers await the single
    /// in-flight pass. Never fails; per-carrier failures degrade to mock
    /// fallback registration.
    pub async fn initialize(&self) {
        self.init
            .get_or_init(|| async {
                info!("Initializing carrier registry");
                self.build_providers().await;
                info!(
                    "Carrier registry ready ({} carriers)",
                    self.providers.read().unwrap().len()
                );
            })
            .await;
    }

    /// Load configs, read credentials, and construct one provider per carrier
    async fn build_providers(&self) {
        for id in CarrierId::ALL {
            let config = CarrierConfig::builtin(id);
            let credentials = CarrierCredentials::from_env(id);

            self.configs.write().unwrap().insert(id, config.clone());

            let factory = self.factories.read().unwrap().get(&id).cloned();
            let provider: Arc<dyn CarrierProvider> = match factory {
                Some(factory) => {
                    match Self::construct(id, factory, config.clone(), credentials).await {
                        Ok(provider) => {
                            info!("{id} provider registered (live-capable: {})",
                                provider.is_available());
                            provider
                        }
                        Err(e) => {
                            warn!("{id} provider initialization failed: {e}; \
                                registering mock fallback");
                            Arc::new(MockCarrierProvider::new(id, config))
                        }
                    }
                }
                None => {
                    debug!("No factory registered for {id}; registering mock fallback");
                    Arc::new(MockCarrierProvider::new(id, config))
                }
            };

            self.providers.write().unwrap().insert(id, provider);
        }
    }

    /// Construct and initialize a real provider via its factory
    async fn construct(
        id: CarrierId,
        factory: Arc<dyn CarrierProviderFactory>,
        config: CarrierConfig,
        credentials: CarrierCredentials,
    ) -> crate::Result<Arc<dyn CarrierProvider>> {
        let provider: Arc<dyn CarrierProvider> = Arc::from(factory.create(config, credentials)?);
        provider
            .initialize()
            .await
            .map_err(|e| crate::Error::initialization(id, e.to_string()))?;
        Ok(provider)
    }

    /// The provider for a carrier, triggering lazy initialization on first use
    pub async fn get(&self, id: CarrierId) -> Option<Arc<dyn CarrierProvider>> {
        self.initialize().await;
        self.providers.read().unwrap().get(&id).cloned()
    }

    /// Whether a carrier currently has a registered provider
    pub fn is_supported(&self, id: CarrierId) -> bool {
        self.providers.read().unwrap().contains_key(&id)
    }

    /// All carriers with a registered provider, in declaration order
    pub fn supported_carriers(&self) -> Vec<CarrierId> {
        let providers = self.providers.read().unwrap();
        CarrierId::ALL
            .into_iter()
            .filter(|id| providers.contains_key(id))
            .collect()
    }

    /// The loaded configuration for a carrier
    pub fn config(&self, id: CarrierId) -> Option<CarrierConfig> {
        self.configs.read().unwrap().get(&id).cloned()
    }
}
