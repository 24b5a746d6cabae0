//! Record model representing one article returned by any provider.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::normalize::{clean_author_list, normalize_string, normalize_year, validate_doi};

/// Sentinel stored in textual fields when the provider gave no value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sentinel used for records without a usable publication year.
pub const UNDATED: &str = "n.d.";

/// Publication year of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Year {
    /// A four-digit year
    Dated(u16),
    /// No year could be determined
    Undated,
}

impl Year {
    /// Returns the year as a number, if known
    pub fn value(&self) -> Option<u16> {
        match self {
            Year::Dated(y) => Some(*y),
            Year::Undated => None,
        }
    }

    pub fn is_dated(&self) -> bool {
        matches!(self, Year::Dated(_))
    }
}

impl From<String> for Year {
    fn from(raw: String) -> Self {
        normalize_year(&raw)
    }
}

impl From<Year> for String {
    fn from(year: Year) -> Self {
        year.to_string()
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Year::Dated(y) => write!(f, "{:04}", y),
            Year::Undated => f.write_str(UNDATED),
        }
    }
}

/// Digital Object Identifier of a record
///
/// Only identifiers starting with `10.` are accepted as [`Doi::Valid`];
/// anything else collapses to [`Doi::Absent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Doi {
    Valid(String),
    Absent,
}

impl Doi {
    /// Parse and validate a raw DOI string
    pub fn parse(raw: &str) -> Self {
        validate_doi(raw)
    }

    /// The DOI as given by the provider, if valid
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Doi::Valid(doi) => Some(doi),
            Doi::Absent => None,
        }
    }

    /// Lower-cased DOI used for identity comparisons
    pub fn normalized(&self) -> Option<String> {
        self.as_str().map(|doi| doi.trim().to_lowercase())
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Doi::Valid(_))
    }
}

impl From<String> for Doi {
    fn from(raw: String) -> Self {
        validate_doi(&raw)
    }
}

impl From<Doi> for String {
    fn from(doi: Doi) -> Self {
        doi.to_string()
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Doi::Valid(doi) => f.write_str(doi),
            Doi::Absent => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// A normalized article record from any provider
///
/// Every field always carries either a real value or its sentinel
/// ([`NOT_AVAILABLE`], [`Year::Undated`], [`Doi::Absent`], `0` citations),
/// so serialized records never have missing keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Article title
    pub title: String,

    /// Authors as one comma-separated display string
    pub authors: String,

    /// Publication year
    pub year: Year,

    /// Journal, conference or repository name
    pub venue: String,

    /// Name of the provider that produced this record
    pub source: String,

    /// Number of citations reported by the provider
    #[serde(default)]
    pub citation_count: u32,

    /// Digital Object Identifier
    pub doi: Doi,

    /// License name or URL
    pub license: String,

    /// Landing page URL
    pub url: String,
}

impl Record {
    /// Create a record with the given title and provider; every other field holds its sentinel
    pub fn new(title: impl AsRef<str>, source: impl Into<String>) -> Self {
        Self {
            title: normalize_string(title.as_ref()),
            authors: NOT_AVAILABLE.to_string(),
            year: Year::Undated,
            venue: NOT_AVAILABLE.to_string(),
            source: source.into(),
            citation_count: 0,
            doi: Doi::Absent,
            license: NOT_AVAILABLE.to_string(),
            url: NOT_AVAILABLE.to_string(),
        }
    }

    /// Returns the author names as a vector
    pub fn author_list(&self) -> Vec<&str> {
        if self.authors == NOT_AVAILABLE {
            return Vec::new();
        }
        self.authors
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether the title is a real value rather than the sentinel
    pub fn has_title(&self) -> bool {
        !self.title.is_empty() && self.title != NOT_AVAILABLE
    }
}

/// Builder for constructing Record objects
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Create a new builder with required fields
    pub fn new(title: impl AsRef<str>, source: impl Into<String>) -> Self {
        Self {
            record: Record::new(title, source),
        }
    }

    /// Set authors from individual names
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.record.authors = clean_author_list(authors);
        self
    }

    /// Set the year from free text ("2021", "2021-05-04", "Spring 2019", ...)
    pub fn year_text(mut self, raw: &str) -> Self {
        self.record.year = normalize_year(raw);
        self
    }

    /// Set the year from a number
    pub fn year(mut self, year: u16) -> Self {
        self.record.year = normalize_year(&year.to_string());
        self
    }

    /// Set venue
    pub fn venue(mut self, venue: impl AsRef<str>) -> Self {
        self.record.venue = normalize_string(venue.as_ref());
        self
    }

    /// Set citation count
    pub fn citations(mut self, count: u32) -> Self {
        self.record.citation_count = count;
        self
    }

    /// Set DOI; invalid identifiers are stored as [`Doi::Absent`]
    pub fn doi(mut self, doi: impl AsRef<str>) -> Self {
        self.record.doi = Doi::parse(doi.as_ref());
        self
    }

    /// Set license
    pub fn license(mut self, license: impl AsRef<str>) -> Self {
        self.record.license = normalize_string(license.as_ref());
        self
    }

    /// Set URL
    pub fn url(mut self, url: impl AsRef<str>) -> Self {
        let url = url.as_ref().trim();
        self.record.url = if url.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            url.to_string()
        };
        self
    }

    /// Build the Record
    pub fn build(self) -> Record {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_to_sentinels() {
        let record = Record::new("Graph Neural Networks", "arXiv");

        assert_eq!(record.title, "Graph Neural Networks");
        assert_eq!(record.authors, NOT_AVAILABLE);
        assert_eq!(record.year, Year::Undated);
        assert_eq!(record.venue, NOT_AVAILABLE);
        assert_eq!(record.citation_count, 0);
        assert_eq!(record.doi, Doi::Absent);
        assert_eq!(record.license, NOT_AVAILABLE);
        assert_eq!(record.url, NOT_AVAILABLE);
    }

    #[test]
    fn test_record_builder() {
        let record = RecordBuilder::new("Attention Is All You Need", "CrossRef")
            .authors(["Ashish Vaswani", " Noam Shazeer ", ""])
            .year_text("2017-06-12")
            .venue("NeurIPS")
            .citations(90000)
            .doi("10.5555/3295222.3295349")
            .url("https://example.org/attention")
            .build();

        assert_eq!(record.authors, "Ashish Vaswani, Noam Shazeer");
        assert_eq!(record.author_list(), vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(record.year, Year::Dated(2017));
        assert_eq!(record.doi.as_str(), Some("10.5555/3295222.3295349"));
        assert_eq!(record.citation_count, 90000);
    }

    #[test]
    fn test_invalid_doi_becomes_absent() {
        let record = RecordBuilder::new("Title", "X").doi("not-a-doi").build();
        assert_eq!(record.doi, Doi::Absent);
        assert_eq!(record.doi.to_string(), NOT_AVAILABLE);
    }

    #[test]
    fn test_serialized_record_has_every_key() {
        let record = Record::new("Title", "Mock");
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "title",
            "authors",
            "year",
            "venue",
            "source",
            "citation_count",
            "doi",
            "license",
            "url",
        ] {
            assert!(object.contains_key(key), "missing key {}", key);
        }
        assert_eq!(object["year"], UNDATED);
        assert_eq!(object["doi"], NOT_AVAILABLE);
    }

    #[test]
    fn test_record_json_round_trip_keeps_sentinels() {
        let record = RecordBuilder::new("Title", "Mock")
            .year(2020)
            .doi("10.1/x")
            .build();
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
