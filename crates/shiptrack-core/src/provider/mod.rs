// # Shared Provider Behavior
//
// `ProviderContext` carries the behavior every carrier provider shares:
// credential-based availability, mock-data lookup, OAuth token acquisition,
// authenticated request construction, and timeout-bounded execution.
// Concrete providers embed a context and implement only `track` (plus any
// carrier-specific overrides).
//
// `MockCarrierProvider` is the always-available fallback the registry
// substitutes when a real provider cannot be constructed or initialized.
//
// ## Security
//
// Credentials never appear in logs; `CarrierCredentials` has a redacting
// Debug implementation and tokens are only ever written into request
// headers.

use crate::config::{AuthType, CarrierConfig, CarrierCredentials};
use crate::error::{Error, Result};
use crate::model::{CarrierId, TrackingInfo, TrackingStatus};
use crate::traits::CarrierProvider;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::RwLock;

/// Shared state and behavior embedded by every carrier provider
pub struct ProviderContext {
    carrier: CarrierId,
    config: CarrierConfig,
    credentials: CarrierCredentials,

    /// HTTP client for carrier API requests
    client: reqwest::Client,

    /// OAuth access token acquired by `initialize()`; absent for other
    /// auth types and before initialization
    access_token: RwLock<Option<String>>,
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("carrier", &self.carrier)
            .field("auth_type", &self.config.auth_type)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl ProviderContext {
    /// Create a context for a carrier
    ///
    /// The HTTP client carries the provider-configured timeout as a
    /// backstop; `execute` additionally bounds each call explicitly.
    pub fn new(
        carrier: CarrierId,
        config: CarrierConfig,
        credentials: CarrierCredentials,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();

        Self {
            carrier,
            config,
            credentials,
            client,
            access_token: RwLock::new(None),
        }
    }

    /// The carrier this context serves
    pub fn carrier(&self) -> CarrierId {
        self.carrier
    }

    /// The carrier's static configuration
    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    /// The carrier's credentials
    pub fn credentials(&self) -> &CarrierCredentials {
        &self.credentials
    }

    /// Default availability check: the configured auth type's required
    /// credential fields are all present. Never touches the network.
    pub fn is_available(&self) -> bool {
        self.credentials.satisfies(self.config.auth_type)
    }

    /// Default one-time setup: acquire the OAuth token when needed
    pub async fn initialize(&self) -> Result<()> {
        if self.config.auth_type == AuthType::OAuth {
            self.acquire_access_token().await?;
        }
        Ok(())
    }

    /// Look up a canned record, stamping timestamps at lookup time
    pub fn mock_data(&self, tracking_number: &str) -> Option<TrackingInfo> {
        self.config
            .mock_record(tracking_number)
            .map(|record| record.materialize(tracking_number, self.carrier))
    }

    /// Map raw carrier status text via the configured table
    pub fn map_status(&self, carrier_status: &str) -> TrackingStatus {
        self.config.map_status(carrier_status)
    }

    /// Acquire an OAuth access token via the client-credentials flow
    async fn acquire_access_token(&self) -> Result<()> {
        let (Some(client_id), Some(client_secret)) =
            (&self.credentials.client_id, &self.credentials.client_secret)
        else {
            return Err(Error::auth(
                self.carrier,
                "OAuth credentials not configured",
            ));
        };

        let oauth_path = self.config.endpoints.oauth.as_deref().ok_or_else(|| {
            Error::config(format!("{} config has no OAuth token endpoint", self.carrier))
        })?;

        let url = format!("{}{}", self.config.api_endpoint, oauth_path);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];

        tracing::debug!("Acquiring OAuth token for {}", self.carrier);
        let response = self.execute(self.client.post(&url).form(&params)).await?;

        if !response.status().is_success() {
            return Err(Error::auth(
                self.carrier,
                format!("token request rejected: {}", response.status()),
            ));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            Error::invalid_response(self.carrier, format!("token response: {e}"))
        })?;

        let token = body["access_token"].as_str().ok_or_else(|| {
            Error::auth(self.carrier, "token response missing access_token")
        })?;

        *self.access_token.write().unwrap() = Some(token.to_string());
        tracing::debug!("OAuth token acquired for {}", self.carrier);
        Ok(())
    }

    /// Build a POST request against a carrier API path with the auth
    /// header for the configured scheme applied.
    ///
    /// Body and content type are the caller's responsibility (`.json()`
    /// for the JSON carriers, `.form()` for USPS).
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.api_endpoint, path);
        let builder = self.client.post(&url);

        match self.auth_header_value() {
            Some(value) => builder.header(reqwest::header::AUTHORIZATION, value),
            None => builder,
        }
    }

    /// The Authorization header value for the configured auth scheme,
    /// or `None` when the scheme needs no header (or no token/credentials
    /// are present yet).
    fn auth_header_value(&self) -> Option<String> {
        match self.config.auth_type {
            AuthType::None => None,
            AuthType::OAuth => self
                .access_token
                .read()
                .unwrap()
                .as_ref()
                .map(|token| format!("Bearer {token}")),
            AuthType::Bearer | AuthType::ApiKey => self
                .credentials
                .api_key
                .as_ref()
                .map(|key| format!("Bearer {key}")),
            AuthType::Basic => {
                let (user, pass) = (
                    self.credentials.username.as_ref()?,
                    self.credentials.password.as_ref()?,
                );
                let encoded = BASE64.encode(format!("{user}:{pass}"));
                Some(format!("Basic {encoded}"))
            }
        }
    }

    /// Send a request bounded by the provider-configured timeout
    ///
    /// A timeout aborts the in-flight call and surfaces [`Error::Timeout`],
    /// distinct from generic transport failure.
    pub async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        match tokio::time::timeout(self.config.timeout(), request.send()).await {
            Err(_) => Err(Error::timeout(self.carrier, self.config.timeout_secs)),
            Ok(Err(e)) if e.is_timeout() => {
                Err(Error::timeout(self.carrier, self.config.timeout_secs))
            }
            Ok(Err(e)) => Err(Error::carrier_api(
                self.carrier,
                format!("HTTP request failed: {e}"),
            )),
            Ok(Ok(response)) => Ok(response),
        }
    }

    #[cfg(test)]
    fn store_token_for_tests(&self, token: &str) {
        *self.access_token.write().unwrap() = Some(token.to_string());
    }
}

/// Always-available fallback provider serving canned or synthetic records
///
/// The registry substitutes this provider when a real one cannot be
/// constructed or initialized, so a carrier stays supported without
/// credentials. `track` never fails and never touches the network.
pub struct MockCarrierProvider {
    ctx: ProviderContext,
}

impl MockCarrierProvider {
    /// Create a mock provider from a carrier's config
    ///
    /// The auth type is forced to `None` so the provider is always
    /// available; only the mock table and status mapping remain relevant.
    pub fn new(carrier: CarrierId, mut config: CarrierConfig) -> Self {
        config.auth_type = AuthType::None;
        Self {
            ctx: ProviderContext::new(carrier, config, CarrierCredentials::default()),
        }
    }
}

#[async_trait]
impl CarrierProvider for MockCarrierProvider {
    fn carrier(&self) -> CarrierId {
        self.ctx.carrier()
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
        if let Some(info) = self.ctx.mock_data(tracking_number) {
            return Ok(info);
        }

        Ok(TrackingInfo::unavailable(tracking_number, self.ctx.carrier()))
    }
}
