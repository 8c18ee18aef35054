//! Catalog Fetcher
//!
//! Pulls the `/processes` catalog of every registered provider, one request at
//! a time, over a single HTTP session. Each provider's outcome is recorded on
//! its own, so an unreachable or misbehaving provider never stops the rest.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error};

use crate::auth::ProviderAuth;
use crate::config::{ProviderConfig, ProviderRegistry};
use crate::types::{error_chain, CatalogResponse, FetchError, ProcessDescriptor, RawCatalogs};

/// Default per-request timeout when a provider sets none
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for anything that can produce a provider's process catalog
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one provider's catalog.
    ///
    /// `Ok(None)` means the provider answered but had no `processes` field.
    async fn fetch_catalog(
        &self,
        key: &str,
        provider: &ProviderConfig,
    ) -> Result<Option<Vec<ProcessDescriptor>>, FetchError>;
}

/// Settings for the HTTP session opened per aggregation
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Used for providers without their own `timeout`
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: concat!("process-hub/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// One connection pool shared by every provider request of an aggregation.
/// Dropping it releases the pool.
pub struct HttpSession {
    client: Client,
    default_timeout: Duration,
}

impl HttpSession {
    pub fn open(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            default_timeout: settings.request_timeout,
        })
    }
}

#[async_trait]
impl CatalogSource for HttpSession {
    async fn fetch_catalog(
        &self,
        key: &str,
        provider: &ProviderConfig,
    ) -> Result<Option<Vec<ProcessDescriptor>>, FetchError> {
        let auth = ProviderAuth::resolve(provider.authentication.as_ref())?;
        let url = provider.processes_url();
        let timeout = provider.request_timeout().unwrap_or(self.default_timeout);

        debug!("Requesting {} for provider {}", url, key);

        let request = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(timeout);

        let response = auth.apply(request).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await?;
        let catalog: CatalogResponse = serde_json::from_slice(&body).map_err(FetchError::Decode)?;

        Ok(catalog.processes)
    }
}

/// Fetch every provider's catalog in registry order
pub async fn fetch_catalogs<S>(source: &S, registry: &ProviderRegistry) -> RawCatalogs
where
    S: CatalogSource + ?Sized,
{
    let mut catalogs = RawCatalogs::new();

    for (key, provider) in registry.iter() {
        match source.fetch_catalog(key, provider).await {
            Ok(Some(processes)) => {
                debug!(
                    "Provider {} returned {} processes",
                    provider.display_name(key),
                    processes.len()
                );
                catalogs.record(key, Ok(processes));
            }
            Ok(None) => {
                debug!(
                    "Provider {} returned no processes field",
                    provider.display_name(key)
                );
            }
            Err(e) => {
                error!(provider = %key, "Cannot access {} provider! {}", key, error_chain(&e));
                catalogs.record(key, Err(e));
            }
        }
    }

    catalogs
}
