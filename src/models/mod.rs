//! Core data models for article records and search queries.

mod query;
mod record;

pub use query::{Filters, Query, QueryError, SearchType};
pub use record::{Doi, Record, RecordBuilder, Year, NOT_AVAILABLE, UNDATED};
