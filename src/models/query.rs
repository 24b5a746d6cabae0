//! Search query model and its validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::Record;

/// Field a query is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Title, abstract and other full-text fields
    #[default]
    Keyword,
    /// Title only
    Title,
    /// Author names
    Author,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Keyword => "keyword",
            SearchType::Title => "title",
            SearchType::Author => "author",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" | "keywords" => Ok(SearchType::Keyword),
            "title" => Ok(SearchType::Title),
            "author" => Ok(SearchType::Author),
            other => Err(QueryError::UnknownSearchType(other.to_string())),
        }
    }
}

/// Optional result filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Earliest publication year (inclusive)
    #[serde(default)]
    pub year_min: Option<u16>,

    /// Latest publication year (inclusive)
    #[serde(default)]
    pub year_max: Option<u16>,

    /// Minimum citation count (inclusive)
    #[serde(default)]
    pub min_citations: Option<u32>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.year_min.is_none() && self.year_max.is_none() && self.min_citations.is_none()
    }

    /// Filters that are set, keyed by name in sorted order
    pub fn canonical(&self) -> BTreeMap<&'static str, String> {
        let mut pairs = BTreeMap::new();
        if let Some(min) = self.year_min {
            pairs.insert("year_min", min.to_string());
        }
        if let Some(max) = self.year_max {
            pairs.insert("year_max", max.to_string());
        }
        if let Some(citations) = self.min_citations {
            pairs.insert("min_citations", citations.to_string());
        }
        pairs
    }

    /// Whether a record passes every filter that is set.
    ///
    /// Undated records pass year filters.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(year) = record.year.value() {
            if self.year_min.is_some_and(|min| year < min) {
                return false;
            }
            if self.year_max.is_some_and(|max| year > max) {
                return false;
            }
        }

        if self
            .min_citations
            .is_some_and(|min| record.citation_count < min)
        {
            return false;
        }

        true
    }
}

/// Search query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Search text
    pub text: String,

    /// Field the text is matched against
    #[serde(default)]
    pub search_type: SearchType,

    /// Maximum number of results requested from each provider
    pub limit: usize,

    /// Optional filters
    #[serde(default)]
    pub filters: Filters,
}

impl Query {
    /// Create a keyword query with the default limit of 10
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            search_type: SearchType::Keyword,
            limit: 10,
            filters: Filters::default(),
        }
    }

    /// Set search type
    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Set maximum results per provider
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Replace all filters
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Set the publication year range
    pub fn years(mut self, min: Option<u16>, max: Option<u16>) -> Self {
        self.filters.year_min = min;
        self.filters.year_max = max;
        self
    }

    /// Set minimum citation count
    pub fn min_citations(mut self, min: u32) -> Self {
        self.filters.min_citations = Some(min);
        self
    }

    /// Reject queries no provider should ever see
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.text.trim().is_empty() {
            return Err(QueryError::EmptyText);
        }
        if self.limit == 0 {
            return Err(QueryError::ZeroLimit);
        }
        if let (Some(min), Some(max)) = (self.filters.year_min, self.filters.year_max) {
            if min > max {
                return Err(QueryError::InvalidYearRange { min, max });
            }
        }
        Ok(())
    }
}

/// Invalid query parameters, reported before any provider is contacted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query text cannot be empty")]
    EmptyText,

    #[error("result limit must be a positive number")]
    ZeroLimit,

    #[error("start year {min} is after end year {max}")]
    InvalidYearRange { min: u16, max: u16 },

    #[error("unknown search type: {0} (expected keyword, title or author)")]
    UnknownSearchType(String),
}
