//! Process Hub Library
//!
//! Unified OGC API - Processes listing across several processing providers.
//!
//! ## Flow
//!
//! 1. [`fetcher`] requests `GET <provider.url>/processes` from every provider
//!    in registry order, over one HTTP session, isolating failures per provider
//! 2. [`filter`] keeps only configured, non-excluded processes and renames
//!    them to `<provider>:<id>`
//! 3. [`aggregator`] runs both passes and returns `{ "processes": [...] }`
//!
//! The provider registry is loaded from YAML by [`config`].

pub mod aggregator;
pub mod auth;
pub mod config;
pub mod fetcher;
pub mod filter;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_support;

pub use aggregator::ProcessAggregator;
pub use config::{ConfigError, ProviderConfig, ProviderRegistry};
pub use fetcher::{CatalogSource, HttpSession, HttpSettings};
pub use filter::{build_process_list, ProcessDecision, ProcessRules};
pub use types::{AggregateError, FetchError, FilterError, ProcessDescriptor, ProcessList, RawCatalogs};
