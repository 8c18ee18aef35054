//! Process Hub Types
//!
//! Process descriptors, the aggregated listing, per-provider fetch outcomes
//! and the error types shared by the fetch and filter passes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A single process as advertised by a provider.
///
/// Only `id` is interpreted. Every other field is kept verbatim, in the order
/// the provider sent it. When serialized, `id` always comes first, wherever
/// the provider placed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// Process identifier, unique within its provider
    pub id: String,
    /// Remaining fields of the descriptor
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProcessDescriptor {
    /// Create a descriptor with no extra fields
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Rewrite the id in place to `<provider>:<id>`
    pub fn qualify(&mut self, provider: &str) {
        self.id = format!("{}:{}", provider, self.id);
    }
}

/// The aggregated listing returned to callers: `{ "processes": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessList {
    pub processes: Vec<ProcessDescriptor>,
}

impl ProcessList {
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Qualified ids in listing order
    pub fn ids(&self) -> Vec<&str> {
        self.processes.iter().map(|p| p.id.as_str()).collect()
    }
}

/// Body of a provider's `GET /processes` response
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogResponse {
    #[serde(default)]
    pub processes: Option<Vec<ProcessDescriptor>>,
}

/// Raw catalogs keyed by provider, as produced by the fetch pass.
///
/// A provider with no entry answered without a `processes` field. A provider
/// whose entry is an error failed to fetch. Both read back as an empty catalog.
#[derive(Debug, Default)]
pub struct RawCatalogs {
    entries: HashMap<String, Result<Vec<ProcessDescriptor>, FetchError>>,
}

impl RawCatalogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for one provider, replacing any earlier one
    pub fn record(
        &mut self,
        provider: impl Into<String>,
        outcome: Result<Vec<ProcessDescriptor>, FetchError>,
    ) {
        self.entries.insert(provider.into(), outcome);
    }

    /// Borrow a provider's catalog; empty when absent or failed
    pub fn catalog(&self, provider: &str) -> &[ProcessDescriptor] {
        match self.entries.get(provider) {
            Some(Ok(processes)) => processes,
            _ => &[],
        }
    }

    /// Move a provider's catalog out; empty when absent or failed
    pub fn take(&mut self, provider: &str) -> Vec<ProcessDescriptor> {
        match self.entries.remove(provider) {
            Some(Ok(processes)) => processes,
            Some(Err(_)) | None => Vec::new(),
        }
    }

    pub fn is_failed(&self, provider: &str) -> bool {
        matches!(self.entries.get(provider), Some(Err(_)))
    }

    /// Keys of the providers whose fetch failed
    pub fn failed_providers(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors fetching a single provider's catalog
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credentials could not be resolved
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport failure, timeout or invalid URL
    #[error("Request failed")]
    Request(#[from] reqwest::Error),

    /// Provider answered with anything but 200
    #[error("Response status {status}, {reason}")]
    Status { status: u16, reason: String },

    /// Body was not a catalog object
    #[error("Malformed catalog response")]
    Decode(#[source] serde_json::Error),
}

/// Errors interpreting a provider's process rules
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Malformed process rules for provider {provider}: {reason}")]
    MalformedRules { provider: String, reason: String },
}

impl FilterError {
    pub(crate) fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        FilterError::MalformedRules {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors escaping a whole aggregation call
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Failed to open HTTP session")]
    Session(#[source] reqwest::Error),
}

/// Render an error followed by its `source()` chain
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
