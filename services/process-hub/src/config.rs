//! Provider Registry
//!
//! The static, ordered registry of processing providers, loaded once from YAML
//! at start-up and shared read-only afterwards.
//!
//! ## Sources
//!
//! - `PROCESS_HUB_PROVIDERS`: path to a YAML file
//! - `PROCESS_HUB_PROVIDERS_YAML`: the YAML document itself
//!
//! Provider order in the document is the order of the aggregated listing.

use indexmap::IndexMap;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::AuthConfig;

pub const PROVIDERS_PATH_ENV: &str = "PROCESS_HUB_PROVIDERS";
pub const PROVIDERS_YAML_ENV: &str = "PROCESS_HUB_PROVIDERS_YAML";

/// Configuration of one processing provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Display name used in logs
    #[serde(default)]
    pub name: Option<String>,
    /// Base URL; the catalog lives at `<url>/processes`
    pub url: String,
    #[serde(default)]
    pub authentication: Option<AuthConfig>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Process rules: `[{ <process-id>: [{ exclude: bool }, ...] }, ...]`.
    /// Interpreted while filtering, so a bad shape only affects this provider.
    #[serde(default)]
    pub processes: serde_json::Value,
}

impl ProviderConfig {
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    pub fn processes_url(&self) -> String {
        format!("{}/processes", self.url.trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            provider: key.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                provider: key.to_string(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        if self.timeout == Some(0) {
            return Err(ConfigError::InvalidTimeout(key.to_string()));
        }

        Ok(())
    }
}

/// Ordered provider registry keyed by provider key
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: IndexMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// Build a registry from already-parsed providers, validating each
    pub fn new(providers: IndexMap<String, ProviderConfig>) -> Result<Self, ConfigError> {
        for (key, provider) in &providers {
            provider.validate(key)?;
        }
        Ok(Self { providers })
    }

    /// Parse a YAML document. An empty document yields an empty registry.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let providers: Option<IndexMap<String, ProviderConfig>> =
            serde_yaml::from_str(content).map_err(ConfigError::ParseYaml)?;

        Self::new(providers.unwrap_or_default())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Reading provider registry from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let registry = Self::from_yaml_str(&content)?;
        info!(
            "Loaded {} providers from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Load from the environment: a file path or an inline document, not both
    pub fn load() -> Result<Self, ConfigError> {
        match (
            std::env::var(PROVIDERS_PATH_ENV).ok(),
            std::env::var(PROVIDERS_YAML_ENV).ok(),
        ) {
            (Some(path), None) => Self::from_file(path),
            (None, Some(yaml)) => Self::from_yaml_str(&yaml),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousSource),
            (None, None) => Err(ConfigError::MissingSource),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ProviderConfig> {
        self.providers.get(key)
    }

    /// Providers in registry order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderConfig)> {
        self.providers.iter().map(|(key, provider)| (key.as_str(), provider))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Errors loading the provider registry
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read provider registry {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse provider registry")]
    ParseYaml(#[source] serde_yaml::Error),

    #[error("Invalid url for provider {provider}: {reason}")]
    InvalidUrl { provider: String, reason: String },

    #[error("Timeout for provider {0} must be greater than zero")]
    InvalidTimeout(String),

    #[error("Set only one of PROCESS_HUB_PROVIDERS and PROCESS_HUB_PROVIDERS_YAML")]
    AmbiguousSource,

    #[error("No provider registry given (set PROCESS_HUB_PROVIDERS or PROCESS_HUB_PROVIDERS_YAML)")]
    MissingSource,
}
