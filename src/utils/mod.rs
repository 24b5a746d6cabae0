//! Utility modules supporting the search pipeline.
//!
//! - [`CacheService`]: fingerprinted, TTL-bounded on-disk cache of per-source results
//! - [`RateLimiter`]: per-source minimum-interval throttle
//! - [`DedupIndex`] / [`deduplicate_records`]: DOI-then-title deduplication
//! - [`HttpClient`]: shared reqwest client with provider error mapping
//! - [`normalize`]: field cleanup used by the source adapters
//!
//! # Deduplication
//!
//! ```rust
//! use research_finder::models::RecordBuilder;
//! use research_finder::utils::deduplicate_records;
//!
//! let records = vec![
//!     RecordBuilder::new("AI and the Future", "arXiv").doi("10.1001/ai").build(),
//!     RecordBuilder::new("AI and the Future", "CrossRef").doi("10.1001/AI").build(),
//! ];
//! assert_eq!(deduplicate_records(records).len(), 1);
//! ```

pub mod cache;
mod dedup;
mod http;
pub mod normalize;
mod rate_limit;

pub use cache::{fingerprint, CacheEntry, CacheError, CacheResult, CacheService, CacheStats};
pub use dedup::{deduplicate_records, DedupIndex, DedupKey};
pub use http::{HttpClient, DEFAULT_USER_AGENT};
pub use rate_limit::RateLimiter;
