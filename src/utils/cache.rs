//! Local caching of per-source search results.
//!
//! Every (query, source) pair maps to one JSON file named after its
//! fingerprint. Each file carries the records plus metadata, including an
//! explicit `written_at` timestamp that decides freshness.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/research-finder/
//!   <md5 fingerprint>.json
//! ```
//!
//! Entries older than the TTL read as absent and are only removed by
//! [`CacheService::clear_expired`]. Read and write failures are logged and
//! treated as a miss; they never fail a search.

use crate::config::CacheConfig;
use crate::models::{Query, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cache metadata stored with each cached item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Fingerprint the entry is stored under
    pub fingerprint: String,

    /// When the entry was written
    pub written_at: DateTime<Utc>,

    /// Source that provided the records
    pub source: String,

    /// Query text that was executed
    pub query: String,
}

/// One cached source result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub metadata: CacheMetadata,
    pub records: Vec<Record>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(
        fingerprint: impl Into<String>,
        source: impl Into<String>,
        query: impl Into<String>,
        records: Vec<Record>,
    ) -> Self {
        Self {
            metadata: CacheMetadata {
                fingerprint: fingerprint.into(),
                written_at: Utc::now(),
                source: source.into(),
                query: query.into(),
            },
            records,
        }
    }

    /// Override the write timestamp
    pub fn written_at(mut self, written_at: DateTime<Utc>) -> Self {
        self.metadata.written_at = written_at;
        self
    }
}

/// Result of a cache lookup
#[derive(Debug, PartialEq)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired
    Expired,
}

impl<T> CacheResult<T> {
    /// Collapse into an option; expired entries read as absent
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheResult::Hit(value) => Some(value),
            CacheResult::Miss | CacheResult::Expired => None,
        }
    }
}

/// Cache maintenance errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache entry is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Compute the fingerprint of a query against one source.
///
/// The key is the md5 hex digest of
/// `{lowercased text}_{source}_{limit}_{search type}{filters}`, where the
/// filters part is `_key_value` for each set filter in sorted key order.
pub fn fingerprint(query: &Query, source: &str) -> String {
    fingerprint_parts(
        &query.text,
        source,
        query.limit,
        query.search_type.as_str(),
        query.filters.canonical(),
    )
}

/// Fingerprint from raw parts. Filter pairs may come in any order.
pub fn fingerprint_parts<I, K, V>(
    text: &str,
    source: &str,
    limit: usize,
    search_type: &str,
    filters: I,
) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = filters
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();
    pairs.sort();

    let filter_str = if pairs.is_empty() {
        String::new()
    } else {
        let joined: Vec<String> = pairs.iter().map(|(k, v)| format!("{}_{}", k, v)).collect();
        format!("_{}", joined.join("_"))
    };

    let input = format!(
        "{}_{}_{}_{}{}",
        text.to_lowercase(),
        source,
        limit,
        search_type,
        filter_str
    );

    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Cache service for storing and retrieving cached search results
#[derive(Debug, Clone)]
pub struct CacheService {
    /// Cache directory
    cache_dir: PathBuf,

    /// Entry time-to-live
    ttl: Duration,

    /// Whether reads and writes happen at all
    enabled: bool,
}

impl CacheService {
    /// Create a cache in `cache_dir` with the given TTL
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl,
            enabled: true,
        }
    }

    /// Create a cache service from configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            cache_dir: config.resolved_directory(),
            ttl: config.ttl(),
            enabled: config.enabled,
        }
    }

    /// A cache that always misses and never writes
    pub fn disabled() -> Self {
        Self {
            cache_dir: PathBuf::new(),
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create the cache directory
    pub fn initialize(&self) -> Result<(), CacheError> {
        if self.enabled {
            fs::create_dir_all(&self.cache_dir).map_err(|e| CacheError::io(&self.cache_dir, e))?;
            tracing::debug!("Cache initialized at: {}", self.cache_dir.display());
        } else {
            tracing::debug!("Cache is disabled");
        }
        Ok(())
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", fingerprint))
    }

    /// Freshness rule: valid iff `now - written_at < ttl`
    fn is_fresh(&self, written_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(written_at);
        match age.to_std() {
            Ok(age) => age < self.ttl,
            // Written in the future (clock skew); treat as fresh
            Err(_) => !self.ttl.is_zero(),
        }
    }

    /// Look up an entry, distinguishing misses from expired entries
    pub fn lookup(&self, fingerprint: &str) -> CacheResult<Vec<Record>> {
        self.lookup_at(fingerprint, Utc::now())
    }

    /// Look up an entry as of `now`
    pub fn lookup_at(&self, fingerprint: &str, now: DateTime<Utc>) -> CacheResult<Vec<Record>> {
        if !self.enabled {
            return CacheResult::Miss;
        }

        let path = self.entry_path(fingerprint);
        match read_entry(&path) {
            Ok(Some(entry)) => {
                if self.is_fresh(entry.metadata.written_at, now) {
                    tracing::debug!(
                        "Cache HIT for {} ({} records from {})",
                        fingerprint,
                        entry.records.len(),
                        entry.metadata.source
                    );
                    CacheResult::Hit(entry.records)
                } else {
                    tracing::debug!("Cache expired for {}", fingerprint);
                    CacheResult::Expired
                }
            }
            Ok(None) => {
                tracing::debug!("Cache MISS for {}", fingerprint);
                CacheResult::Miss
            }
            Err(e) => {
                tracing::warn!("Error reading cache file {}: {}", path.display(), e);
                CacheResult::Miss
            }
        }
    }

    /// Get fresh records for a fingerprint
    pub fn get(&self, fingerprint: &str) -> Option<Vec<Record>> {
        self.lookup(fingerprint).into_option()
    }

    /// Store records under a fingerprint. Empty record lists are not cached.
    pub fn set(&self, fingerprint: &str, records: &[Record]) {
        let source = records
            .first()
            .map(|r| r.source.clone())
            .unwrap_or_default();
        self.put(CacheEntry::new(fingerprint, source, "", records.to_vec()));
    }

    /// Store a complete entry. Empty record lists are not cached.
    ///
    /// The entry is written to a temporary file in the cache directory and
    /// renamed into place, so concurrent writers never leave a torn file and
    /// the last writer wins.
    pub fn put(&self, entry: CacheEntry) {
        if !self.enabled {
            return;
        }

        if entry.records.is_empty() {
            tracing::debug!(
                "No results to cache for {} query '{}'",
                entry.metadata.source,
                entry.metadata.query
            );
            return;
        }

        match self.write_entry(&entry) {
            Ok(()) => tracing::debug!(
                "Cached {} results for {} query '{}'",
                entry.records.len(),
                entry.metadata.source,
                entry.metadata.query
            ),
            Err(e) => tracing::warn!("Failed to cache search result: {}", e),
        }
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| CacheError::io(&self.cache_dir, e))?;

        let path = self.entry_path(&entry.metadata.fingerprint);
        let mut file = tempfile::NamedTempFile::new_in(&self.cache_dir)
            .map_err(|e| CacheError::io(&self.cache_dir, e))?;

        serde_json::to_writer(&mut file, entry)?;
        file.flush().map_err(|e| CacheError::io(file.path(), e))?;
        file.persist(&path)
            .map_err(|e| CacheError::io(&path, e.error))?;
        Ok(())
    }

    /// Cache files currently on disk
    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.cache_dir, e)),
        };

        Ok(entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect())
    }

    /// Remove every cache entry, returning how many were removed
    pub fn clear(&self) -> Result<usize, CacheError> {
        if !self.enabled {
            return Ok(0);
        }

        let mut removed = 0;
        for path in self.entry_files()? {
            if remove_entry(&path)? {
                removed += 1;
            }
        }

        tracing::info!("Cache cleared ({} entries)", removed);
        Ok(removed)
    }

    /// Remove expired and unreadable entries, returning how many were removed
    pub fn clear_expired(&self) -> Result<usize, CacheError> {
        self.clear_expired_at(Utc::now())
    }

    /// Remove entries that are stale as of `now`
    pub fn clear_expired_at(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        if !self.enabled {
            return Ok(0);
        }

        let mut removed = 0;
        for path in self.entry_files()? {
            if !self.is_stale(&path, now) {
                continue;
            }

            // A concurrent writer may have replaced the file since it was listed
            if self.is_stale(&path, now) && remove_entry(&path)? {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Removed {} expired cache files", removed);
        }
        Ok(removed)
    }

    /// Whether the file at `path` is expired or unreadable. Missing files are not stale.
    fn is_stale(&self, path: &Path, now: DateTime<Utc>) -> bool {
        match read_entry(path) {
            Ok(Some(entry)) => !self.is_fresh(entry.metadata.written_at, now),
            Ok(None) => false,
            Err(e) => {
                tracing::debug!("Unreadable cache file {}: {}", path.display(), e);
                true
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if !self.enabled {
            return CacheStats::disabled();
        }

        let now = Utc::now();
        let files = self.entry_files().unwrap_or_default();
        let mut expired = 0;
        let mut size_bytes = 0;

        for path in &files {
            size_bytes += fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            match read_entry(path) {
                Ok(Some(entry)) if self.is_fresh(entry.metadata.written_at, now) => {}
                _ => expired += 1,
            }
        }

        CacheStats {
            enabled: true,
            cache_dir: self.cache_dir.clone(),
            entries: files.len(),
            expired,
            size_kb: size_bytes / 1024,
            ttl: self.ttl,
        }
    }
}

/// Read a cache file; `Ok(None)` when it does not exist
fn read_entry(path: &Path) -> Result<Option<CacheEntry>, CacheError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

/// Delete a cache file. Returns `false` if another process already removed it.
fn remove_entry(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Whether caching is enabled
    pub enabled: bool,

    /// Cache directory path
    pub cache_dir: PathBuf,

    /// Number of entry files
    pub entries: usize,

    /// Entries that are stale or unreadable
    pub expired: usize,

    /// Total size in KB
    pub size_kb: u64,

    /// Entry time-to-live
    pub ttl: Duration,
}

impl CacheStats {
    /// Return stats indicating cache is disabled
    fn disabled() -> Self {
        Self {
            enabled: false,
            cache_dir: PathBuf::new(),
            entries: 0,
            expired: 0,
            size_kb: 0,
            ttl: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordBuilder, SearchType};
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn sample_records() -> Vec<Record> {
        vec![
            RecordBuilder::new("Test Paper 1", "Mock").doi("10.1/one").build(),
            RecordBuilder::new("Test Paper 2", "Mock").year(2021).build(),
        ]
    }

    fn json_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let query = Query::new("Test Query");
        assert_eq!(fingerprint(&query, "arXiv"), fingerprint(&query, "arXiv"));
        assert_eq!(
            fingerprint(&Query::new("test query"), "arXiv"),
            fingerprint(&query, "arXiv")
        );
        assert_eq!(fingerprint(&query, "arXiv").len(), 32);
    }

    #[test]
    fn test_fingerprint_distinguishes_parameters() {
        let base = Query::new("test query");
        let key = fingerprint(&base, "arXiv");

        assert_ne!(key, fingerprint(&Query::new("another query"), "arXiv"));
        assert_ne!(key, fingerprint(&base, "Semantic Scholar"));
        assert_ne!(key, fingerprint(&base.clone().limit(20), "arXiv"));
        assert_ne!(
            key,
            fingerprint(&base.clone().search_type(SearchType::Author), "arXiv")
        );
        assert_ne!(key, fingerprint(&base.min_citations(5), "arXiv"));
    }

    #[test]
    fn test_fingerprint_ignores_filter_order() {
        let a = fingerprint_parts("q", "arXiv", 10, "keyword", [("a", "1"), ("b", "2")]);
        let b = fingerprint_parts("q", "arXiv", 10, "keyword", [("b", "2"), ("a", "1")]);
        let none = fingerprint_parts("q", "arXiv", 10, "keyword", Vec::<(&str, &str)>::new());

        assert_eq!(a, b);
        assert_ne!(a, none);
    }

    #[test]
    fn test_fingerprint_matches_reference_layout() {
        let expected = format!("{:x}", md5::compute("test query_arXiv_10_keyword".as_bytes()));
        assert_eq!(fingerprint(&Query::new("Test Query"), "arXiv"), expected);

        let with_filters = Query::new("q").years(Some(2020), None).min_citations(3);
        let expected = format!(
            "{:x}",
            md5::compute("q_arXiv_10_keyword_min_citations_3_year_min_2020".as_bytes())
        );
        assert_eq!(fingerprint(&with_filters, "arXiv"), expected);
    }

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        let key = fingerprint(&Query::new("test query"), "Mock");
        assert_eq!(cache.get(&key), None);

        cache.set(&key, &sample_records());
        assert_eq!(cache.get(&key), Some(sample_records()));

        let other = fingerprint(&Query::new("different query"), "Mock");
        assert_eq!(cache.lookup(&other), CacheResult::Miss);
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);
        let key = "overwrite";

        cache.set(key, &sample_records());
        let newer = vec![RecordBuilder::new("New Test Paper", "Mock").build()];
        cache.set(key, &newer);

        assert_eq!(cache.get(key), Some(newer));
        assert_eq!(json_files(temp_dir.path()), 1);
    }

    #[test]
    fn test_empty_set_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        cache.set("empty", &[]);

        assert_eq!(json_files(temp_dir.path()), 0);
        assert_eq!(cache.lookup("empty"), CacheResult::Miss);
    }

    #[test]
    fn test_ttl_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);
        let written_at = Utc::now();

        cache.put(CacheEntry::new("boundary", "Mock", "q", sample_records()).written_at(written_at));

        let just_before = written_at + chrono::Duration::seconds(3599);
        let exactly = written_at + chrono::Duration::seconds(3600);

        assert!(matches!(cache.lookup_at("boundary", just_before), CacheResult::Hit(_)));
        assert_eq!(cache.lookup_at("boundary", exactly), CacheResult::Expired);
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        let old = Utc::now() - chrono::Duration::hours(2);
        cache.put(CacheEntry::new("old", "Mock", "q", sample_records()).written_at(old));

        assert_eq!(cache.lookup("old"), CacheResult::Expired);
        assert_eq!(cache.get("old"), None);
        // Still on disk until purged
        assert_eq!(json_files(temp_dir.path()), 1);
    }

    #[test]
    fn test_corrupt_file_reads_as_miss() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        fs::write(temp_dir.path().join("corrupt.json"), "this is not valid json").unwrap();

        assert_eq!(cache.lookup("corrupt"), CacheResult::Miss);
    }

    #[test]
    fn test_clear_removes_all_entries() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        cache.set("one", &sample_records());
        cache.set("two", &sample_records());
        assert_eq!(json_files(temp_dir.path()), 2);

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(json_files(temp_dir.path()), 0);
    }

    #[test]
    fn test_clear_expired_removes_only_stale_entries() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        cache.set("valid", &sample_records());
        let old = Utc::now() - chrono::Duration::hours(2);
        cache.put(CacheEntry::new("stale", "Mock", "q", sample_records()).written_at(old));
        fs::write(temp_dir.path().join("broken.json"), "{").unwrap();

        assert_eq!(cache.clear_expired().unwrap(), 2);
        assert_eq!(json_files(temp_dir.path()), 1);
        assert!(cache.get("valid").is_some());
    }

    #[test]
    fn test_remove_entry_tolerates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.json");

        fs::write(&path, "{}").unwrap();
        assert!(remove_entry(&path).unwrap());
        assert!(!remove_entry(&path).unwrap());
    }

    #[test]
    fn test_clear_expired_skips_entry_refreshed_by_another_writer() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);
        let old = Utc::now() - chrono::Duration::hours(2);

        cache.put(CacheEntry::new("shared", "Mock", "q", sample_records()).written_at(old));
        assert!(cache.is_stale(&cache.entry_path("shared"), Utc::now()));

        // Rewritten fresh before the sweep reaches it
        cache.set("shared", &sample_records());
        assert!(!cache.is_stale(&cache.entry_path("shared"), Utc::now()));
        assert_eq!(cache.clear_expired().unwrap(), 0);
        assert!(cache.get("shared").is_some());

        // Already deleted by someone else
        assert!(!cache.is_stale(&temp_dir.path().join("absent.json"), Utc::now()));
    }

    #[test]
    fn test_concurrent_writers_and_readers_see_whole_entries() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);
        let records: Vec<Record> = (0..50)
            .map(|i| {
                RecordBuilder::new(format!("Paper {i}"), "Mock")
                    .doi(format!("10.1/{i}"))
                    .build()
            })
            .collect();
        cache.set("shared", &records);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        cache.set("shared", &records);
                        match cache.lookup("shared") {
                            CacheResult::Hit(found) => assert_eq!(found.len(), 50),
                            other => panic!("torn or missing entry: {other:?}"),
                        }
                    }
                });
            }
        });

        assert_eq!(json_files(temp_dir.path()), 1);
        assert_eq!(cache.get("shared").map(|r| r.len()), Some(50));
    }

    #[test]
    fn test_clear_on_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path().join("never-created"), HOUR);

        assert_eq!(cache.clear().unwrap(), 0);
        assert_eq!(cache.clear_expired().unwrap(), 0);
    }

    #[test]
    fn test_cache_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig {
            enabled: false,
            directory: Some(temp_dir.path().to_path_buf()),
            ttl_hours: 24,
        };
        let cache = CacheService::from_config(&config);

        cache.set("key", &sample_records());

        assert_eq!(cache.lookup("key"), CacheResult::Miss);
        assert_eq!(json_files(temp_dir.path()), 0);
        assert!(!cache.stats().enabled);
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        cache.set("fresh", &sample_records());
        let old = Utc::now() - chrono::Duration::hours(5);
        cache.put(CacheEntry::new("stale", "Mock", "q", sample_records()).written_at(old));

        let stats = cache.stats();
        assert!(stats.enabled);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.ttl, HOUR);
    }

    #[test]
    fn test_entry_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::new(temp_dir.path(), HOUR);

        cache.put(CacheEntry::new("layout", "Mock", "graph neural networks", sample_records()));

        let raw = fs::read_to_string(temp_dir.path().join("layout.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["metadata"]["fingerprint"], "layout");
        assert_eq!(value["metadata"]["source"], "Mock");
        assert_eq!(value["metadata"]["query"], "graph neural networks");
        assert!(value["metadata"]["written_at"].is_string());
        assert_eq!(value["records"].as_array().unwrap().len(), 2);
    }
}
