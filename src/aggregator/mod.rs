//! Multi-source search orchestration.
//!
//! The [`Aggregator`] visits every registered source in submission order.
//! For each one it consults the cache, otherwise waits on the source's own
//! rate limiter and fetches. Every record, cached or fresh, goes through the
//! query filters and a per-run [`DedupIndex`]; the first occurrence of an
//! article is yielded, later duplicates are dropped. A failing source is
//! recorded in the [`RunSummary`] and never stops the run.
//!
//! ```rust,no_run
//! use research_finder::aggregator::Aggregator;
//! use research_finder::models::Query;
//! use research_finder::sources::MockSource;
//! use research_finder::utils::CacheService;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut aggregator = Aggregator::new(CacheService::disabled());
//! aggregator.add_source(Arc::new(MockSource::new("Mock")));
//!
//! let records = aggregator.collect(&Query::new("graph neural networks")).await?;
//! let summary = aggregator.summary();
//! println!("{} records, failed: {:?}", records.len(), summary.failed);
//! # Ok(())
//! # }
//! ```

mod stream;
mod summary;

pub use stream::RunStream;
pub use summary::{RunState, RunSummary};

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self as futures_stream, StreamExt};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Instrument;

use crate::models::{Query, QueryError, Record};
use crate::sources::{Source, SourceError};
use crate::utils::{cache, CacheEntry, CacheError, CacheService, DedupIndex};

/// Progress notification emitted during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A source is being attempted
    Started { source: String },
    /// A source was served from the cache
    CacheHit { source: String, records: usize },
    /// A source returned fresh records
    Fetched { source: String, records: usize },
    /// A source failed
    Failed { source: String, error: String },
    /// Every source was attempted
    Finished { successful: usize, failed: usize },
}

/// Callback receiving [`RunEvent`]s
pub type RunObserver = Arc<dyn Fn(&RunEvent) + Send + Sync>;

/// Output of [`Aggregator::run_all`]
#[derive(Debug)]
pub enum RunOutput {
    /// Every unique record, after all sources were attempted
    Records(Vec<Record>),
    /// Unique records as they are produced
    Stream(RunStream),
}

impl RunOutput {
    /// Drain the output into a list
    pub async fn into_records(self) -> Vec<Record> {
        match self {
            RunOutput::Records(records) => records,
            RunOutput::Stream(stream) => stream.collect_all().await,
        }
    }
}

/// Result of attempting one source, before dedup
enum Attempt {
    Cached(Vec<Record>),
    Fetched(Vec<Record>),
    Failed(SourceError),
}

/// Shared, read-only settings of one run
struct RunContext {
    cache: Arc<CacheService>,
    request_timeout: Option<Duration>,
    observer: Option<RunObserver>,
}

impl RunContext {
    fn emit(&self, event: RunEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

/// Orchestrates one query across many sources
pub struct Aggregator {
    sources: Vec<Arc<dyn Source>>,
    cache: Arc<CacheService>,
    concurrency: usize,
    request_timeout: Option<Duration>,
    observer: Option<RunObserver>,
    /// Summary of the most recent run
    current: Mutex<Arc<Mutex<RunSummary>>>,
}

impl Aggregator {
    /// Create an aggregator with no sources
    pub fn new(cache: CacheService) -> Self {
        Self {
            sources: Vec::new(),
            cache: Arc::new(cache),
            concurrency: 1,
            request_timeout: None,
            observer: None,
            current: Mutex::new(Arc::new(Mutex::new(RunSummary::default()))),
        }
    }

    /// Append a source; sources are attempted in the order they were added
    pub fn add_source(&mut self, source: Arc<dyn Source>) -> &mut Self {
        tracing::debug!("Added source '{}'", source.id());
        self.sources.push(source);
        self
    }

    /// Append several sources in order
    pub fn with_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        for source in sources {
            self.add_source(source);
        }
        self
    }

    /// Fetch up to `n` sources at the same time. Output order is unchanged.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Fail any single source call that takes longer than `timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Receive progress events
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Registered sources in submission order
    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// Run the query against every source.
    ///
    /// With `stream = true` the returned [`RunStream`] fetches lazily as it
    /// is polled; otherwise every source is attempted before returning. The
    /// query is validated first, so an invalid query never reaches a source.
    pub async fn run_all(&self, query: &Query, stream: bool) -> Result<RunOutput, QueryError> {
        let run = self.stream(query)?;
        if stream {
            Ok(RunOutput::Stream(run))
        } else {
            Ok(RunOutput::Records(run.collect_all().await))
        }
    }

    /// Run the query and return every unique record
    pub async fn collect(&self, query: &Query) -> Result<Vec<Record>, QueryError> {
        Ok(self.run_all(query, false).await?.into_records().await)
    }

    /// Start a streaming run. Resets the summary.
    pub fn stream(&self, query: &Query) -> Result<RunStream, QueryError> {
        query.validate()?;

        let summary = Arc::new(Mutex::new(RunSummary::running()));
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::clone(&summary);

        tracing::info!(
            "Searching {} sources for '{}' ({}, limit {})",
            self.sources.len(),
            query.text,
            query.search_type,
            query.limit
        );

        let ctx = Arc::new(RunContext {
            cache: Arc::clone(&self.cache),
            request_timeout: self.request_timeout,
            observer: self.observer.clone(),
        });
        let query = Arc::new(query.clone());
        let sources = self.sources.clone();
        let concurrency = self.concurrency;
        let run_summary = Arc::clone(&summary);

        let expected = sources.len();

        // Owned futures, so the fan-out does not borrow from the generator
        let attempts: Vec<BoxFuture<'static, (Arc<dyn Source>, Attempt)>> = sources
            .into_iter()
            .map(|source| attempt_owned(Arc::clone(&ctx), source, Arc::clone(&query)).boxed())
            .collect();

        let records = async_stream::stream! {
            let mut attempts = futures_stream::iter(attempts).buffered(concurrency);
            let mut index = DedupIndex::new();

            while let Some((source, outcome)) = attempts.next().await {
                let name = source.name().to_string();

                let records = match outcome {
                    Attempt::Cached(records) => {
                        stream::lock(&run_summary).record_success(&name, true);
                        ctx.emit(RunEvent::CacheHit { source: name.clone(), records: records.len() });
                        records
                    }
                    Attempt::Fetched(records) => {
                        stream::lock(&run_summary).record_success(&name, false);
                        ctx.emit(RunEvent::Fetched { source: name.clone(), records: records.len() });
                        records
                    }
                    Attempt::Failed(error) => {
                        tracing::warn!("Source '{}' failed: {}", name, error);
                        stream::lock(&run_summary).record_failure(&name, error.to_string());
                        ctx.emit(RunEvent::Failed { source: name.clone(), error: error.to_string() });
                        continue;
                    }
                };

                for record in records {
                    if !query.filters.matches(&record) {
                        stream::lock(&run_summary).filtered_out += 1;
                        continue;
                    }
                    if !index.insert(&record) {
                        stream::lock(&run_summary).duplicates_dropped += 1;
                        continue;
                    }
                    stream::lock(&run_summary).records_yielded += 1;
                    yield record;
                }
            }

            let (successful, failed) = {
                let mut summary = stream::lock(&run_summary);
                summary.complete();
                (summary.successful.len(), summary.failed.len())
            };
            tracing::info!(
                "Search finished: {} sources succeeded, {} failed, {} unique records",
                successful,
                failed,
                index.len()
            );
            ctx.emit(RunEvent::Finished { successful, failed });
        };

        Ok(RunStream::new(Box::pin(records), summary, expected))
    }

    /// Summary of the most recent run
    pub fn summary(&self) -> RunSummary {
        let current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let summary = stream::lock(&current).clone();
        summary
    }

    /// Remove every cache entry
    pub fn clear_cache(&self) -> Result<usize, CacheError> {
        self.cache.clear()
    }

    /// Remove stale cache entries
    pub fn clear_expired_cache(&self) -> Result<usize, CacheError> {
        self.cache.clear_expired()
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("sources", &self.sources)
            .field("cache", &self.cache)
            .field("concurrency", &self.concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

async fn attempt_owned(
    ctx: Arc<RunContext>,
    source: Arc<dyn Source>,
    query: Arc<Query>,
) -> (Arc<dyn Source>, Attempt) {
    let outcome = attempt_source(&ctx, source.as_ref(), &query).await;
    (source, outcome)
}

/// Cache lookup, then rate-limited fetch and cache write
async fn attempt_source(ctx: &RunContext, source: &dyn Source, query: &Query) -> Attempt {
    let span = tracing::info_span!("source", id = source.id());

    async {
        ctx.emit(RunEvent::Started {
            source: source.name().to_string(),
        });

        let fingerprint = cache::fingerprint(query, source.name());
        if let Some(records) = ctx.cache.get(&fingerprint) {
            tracing::debug!("Using {} cached records", records.len());
            return Attempt::Cached(records);
        }

        source.rate_limiter().acquire().await;

        let result = match ctx.request_timeout {
            Some(limit) => tokio::time::timeout(limit, source.search(query))
                .await
                .unwrap_or(Err(SourceError::Timeout)),
            None => source.search(query).await,
        };

        match result {
            Ok(records) => {
                tracing::debug!("Fetched {} records", records.len());
                ctx.cache.put(CacheEntry::new(
                    fingerprint,
                    source.name(),
                    query.text.as_str(),
                    records.clone(),
                ));
                Attempt::Fetched(records)
            }
            Err(error) => Attempt::Failed(error),
        }
    }
    .instrument(span)
    .await
}
