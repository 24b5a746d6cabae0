//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{Query, Record, RecordBuilder};
use crate::sources::{Source, SourceError};
use crate::utils::RateLimiter;

/// A mock source that returns predefined records or a predefined failure.
///
/// Every call to `search` is counted, so tests can assert that cache hits
/// skip the provider entirely.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    name: String,
    records: Vec<Record>,
    failure: Option<SourceError>,
    delay: Duration,
    calls: AtomicUsize,
    rate_limiter: RateLimiter,
}

impl MockSource {
    /// Create a mock source that returns no records
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.to_lowercase().replace(' ', "_"),
            name,
            records: Vec::new(),
            failure: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            rate_limiter: RateLimiter::unlimited(),
        }
    }

    /// Records to return from every search
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    /// Fail every search with the given error
    pub fn failing(mut self, error: SourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the default no-op rate limiter
    pub fn with_rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(interval);
        self
    }

    /// Number of times `search` was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn search(&self, query: &Query) -> Result<Vec<Record>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.records.iter().take(query.limit).cloned().collect()),
        }
    }
}

/// Helper function to create a record for testing. An empty DOI means absent.
pub fn make_record(title: &str, doi: &str, source: &str) -> Record {
    RecordBuilder::new(title, source).doi(doi).build()
}
