//! Process Aggregator
//!
//! Entry point of the service: fetches every provider's catalog over one
//! scoped HTTP session, then filters and renames the result into a single
//! `{ "processes": [...] }` listing.

use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ProviderRegistry;
use crate::fetcher::{fetch_catalogs, CatalogSource, HttpSession, HttpSettings};
use crate::filter::build_process_list;
use crate::types::{AggregateError, ProcessList};

/// Aggregates process listings across the providers of a registry
pub struct ProcessAggregator {
    registry: Arc<ProviderRegistry>,
    settings: HttpSettings,
}

impl ProcessAggregator {
    pub fn new(registry: Arc<ProviderRegistry>, settings: HttpSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// List the processes of all providers.
    ///
    /// Provider failures are logged and leave that provider out of the
    /// listing. Only a failure to open the HTTP session is returned.
    pub async fn all_processes(&self) -> Result<ProcessList, AggregateError> {
        let run_id = Uuid::new_v4();

        async move {
            let session = HttpSession::open(&self.settings).map_err(AggregateError::Session)?;
            Ok::<_, AggregateError>(self.aggregate_with(&session).await)
        }
        .instrument(info_span!("all_processes", %run_id))
        .await
    }

    /// Run the fetch and filter passes against any catalog source
    pub async fn aggregate_with<S>(&self, source: &S) -> ProcessList
    where
        S: CatalogSource + ?Sized,
    {
        let raw = fetch_catalogs(source, &self.registry).await;
        let failed = raw.failed_providers().len();

        let list = build_process_list(&self.registry, raw);

        info!(
            providers = self.registry.len(),
            failed_providers = failed,
            processes = list.len(),
            "Aggregated process listing"
        );

        list
    }
}
