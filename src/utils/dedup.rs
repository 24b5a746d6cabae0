//! Deduplication of records across sources.
//!
//! Two records describe the same article when they share a normalized DOI.
//! Records without a valid DOI fall back to their normalized title. The two
//! key spaces are kept apart, so a title-keyed record is never suppressed by
//! a DOI-keyed one and vice versa.

use std::collections::HashSet;

use crate::models::Record;

/// Identity of a record for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Lower-cased DOI
    Doi(String),
    /// Lower-cased, whitespace-collapsed title of a record without DOI
    Title(String),
}

impl DedupKey {
    /// Derive the key for a record.
    ///
    /// Returns `None` when the record has neither a valid DOI nor a real
    /// title; such records cannot be compared and are always kept.
    pub fn for_record(record: &Record) -> Option<Self> {
        if let Some(doi) = record.doi.normalized() {
            return Some(DedupKey::Doi(doi));
        }

        if record.has_title() {
            let title = normalize_title(&record.title);
            if !title.is_empty() {
                return Some(DedupKey::Title(title));
            }
        }

        None
    }
}

/// Normalize a title for comparison
fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Per-run set of keys already yielded. First writer wins.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen_dois: HashSet<String>,
    seen_titles: HashSet<String>,
    duplicates: usize,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate. Returns `true` when it is the first occurrence and
    /// should be kept, `false` when it duplicates an earlier record.
    pub fn insert(&mut self, record: &Record) -> bool {
        let inserted = match DedupKey::for_record(record) {
            Some(DedupKey::Doi(doi)) => self.seen_dois.insert(doi),
            Some(DedupKey::Title(title)) => self.seen_titles.insert(title),
            None => true,
        };

        if !inserted {
            self.duplicates += 1;
        }
        inserted
    }

    /// Whether a record would be rejected, without recording it
    pub fn contains(&self, record: &Record) -> bool {
        match DedupKey::for_record(record) {
            Some(DedupKey::Doi(doi)) => self.seen_dois.contains(&doi),
            Some(DedupKey::Title(title)) => self.seen_titles.contains(&title),
            None => false,
        }
    }

    /// Number of distinct keys seen
    pub fn len(&self) -> usize {
        self.seen_dois.len() + self.seen_titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records rejected as duplicates
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Remove duplicate records from a list, keeping the first occurrence
pub fn deduplicate_records(records: Vec<Record>) -> Vec<Record> {
    let mut index = DedupIndex::new();
    records
        .into_iter()
        .filter(|record| index.insert(record))
        .collect()
}
