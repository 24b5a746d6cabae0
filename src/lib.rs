//! # Research Finder
//!
//! Search several academic article providers for one query, merge their
//! answers into a single deduplicated stream of records, and report which
//! providers succeeded or failed. A failing provider never aborts a run.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Record, Query, Filters)
//! - [`sources`]: Provider adapters behind the [`Source`] trait, and the registry that builds them
//! - [`aggregator`]: The orchestrator: cache lookup, rate-limited fetch, dedup merge, run summary
//! - [`utils`]: HTTP client, rate limiter, cache store, deduplication and field normalization
//! - [`config`]: Layered configuration and its validation
//! - [`ui`]: Terminal rendering used by the `research-finder` binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use research_finder::{Aggregator, Config, Query, SourceRegistry};
//! use research_finder::utils::CacheService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let registry = SourceRegistry::from_config(&config)?;
//!
//! let aggregator = Aggregator::new(CacheService::from_config(&config.cache))
//!     .with_sources(registry.all().cloned())
//!     .with_concurrency(config.search.concurrency);
//!
//! let records = aggregator.collect(&Query::new("graph neural networks")).await?;
//! for record in &records {
//!     println!("{} ({}) [{}]", record.title, record.year, record.source);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod models;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use aggregator::{Aggregator, RunEvent, RunOutput, RunStream, RunSummary};
pub use config::Config;
pub use models::{Query, Record, SearchType};
pub use sources::{Source, SourceError, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
