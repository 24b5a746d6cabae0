//! Article providers behind a common trait-based interface.
//!
//! This module defines the [`Source`] trait that every provider adapter
//! implements. Adapters are collected in a [`SourceRegistry`]; the aggregator
//! only ever sees `Arc<dyn Source>` and has no compile-time knowledge of any
//! concrete provider.
//!
//! # Feature Flags
//!
//! Individual sources can be disabled at compile time using Cargo features:
//!
//! - `arxiv` - Enable arXiv source (default: enabled)
//! - `crossref` - Enable CrossRef source (default: enabled)
//! - `openalex` - Enable OpenAlex source (default: enabled)
//! - `pubmed` - Enable PubMed source (default: enabled)
//! - `semantic` - Enable Semantic Scholar source (default: enabled)
//!
//! # Runtime Source Configuration
//!
//! All compiled sources are used by default. The `[search]` config section
//! (or `RESEARCH_FINDER__SEARCH__ENABLED_SOURCES` /
//! `RESEARCH_FINDER__SEARCH__DISABLED_SOURCES`) narrows the set:
//!
//! 1. If `enabled_sources` is set, only those sources are used
//! 2. `disabled_sources` always takes precedence

#[cfg(feature = "source-arxiv")]
mod arxiv;
#[cfg(feature = "source-crossref")]
mod crossref;
#[cfg(feature = "source-openalex")]
mod openalex;
#[cfg(feature = "source-pubmed")]
mod pubmed;
mod registry;
#[cfg(feature = "source-semantic")]
mod semantic;

pub mod mock;

#[cfg(feature = "source-arxiv")]
pub use arxiv::ArxivSource;
#[cfg(feature = "source-crossref")]
pub use crossref::CrossRefSource;
pub use mock::MockSource;
#[cfg(feature = "source-openalex")]
pub use openalex::OpenAlexSource;
#[cfg(feature = "source-pubmed")]
pub use pubmed::PubMedSource;
pub use registry::{available_sources, SourceContext, SourceDescriptor, SourceRegistry};
#[cfg(feature = "source-semantic")]
pub use semantic::SemanticScholarSource;

use crate::models::{Query, Record};
use crate::utils::RateLimiter;
use async_trait::async_trait;

/// The Source trait defines the interface for all article providers.
///
/// # Implementing a New Source
///
/// 1. Create a struct that owns its own [`RateLimiter`]
/// 2. Implement `id`, `name`, `rate_limiter` and `search`
/// 3. Add a [`SourceDescriptor`] for it in the registry
///
/// `search` is only called after the aggregator has acquired the source's
/// rate limiter and checked the cache; adapters never do either themselves.
/// An empty result list means zero matches, not failure.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "arxiv", "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source, stored in each record's `source` field
    fn name(&self) -> &str;

    /// Throttle owned by this source instance
    fn rate_limiter(&self) -> &RateLimiter;

    /// Fetch up to `query.limit` records matching the query
    async fn search(&self, query: &Query) -> Result<Vec<Record>, SourceError>;
}

/// Errors that can occur when fetching from a source
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Parsing error (XML, JSON, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limit or quota exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
