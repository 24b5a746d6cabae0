//! Pull-based stream of unique records for one run.

use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use super::summary::{RunState, RunSummary};
use crate::models::Record;

type RecordStream = Pin<Box<dyn Stream<Item = Record> + Send>>;

/// Unique records of a run, yielded in source submission order.
///
/// Nothing is fetched until the stream is polled. Dropping the stream before
/// it is exhausted stops the run: sources not yet attempted are skipped and
/// the run summary ends up [`Cancelled`](super::RunState::Cancelled). If
/// every source was already attempted the run counts as completed.
pub struct RunStream {
    inner: RecordStream,
    summary: Arc<Mutex<RunSummary>>,
    /// Number of sources in this run
    expected: usize,
}

impl RunStream {
    pub(crate) fn new(inner: RecordStream, summary: Arc<Mutex<RunSummary>>, expected: usize) -> Self {
        Self {
            inner,
            summary,
            expected,
        }
    }

    /// Snapshot of this run's summary so far
    pub fn summary(&self) -> RunSummary {
        lock(&self.summary).clone()
    }

    /// Drain the remaining records
    pub async fn collect_all(self) -> Vec<Record> {
        self.collect().await
    }
}

impl Stream for RunStream {
    type Item = Record;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        let mut summary = lock(&self.summary);
        if summary.state != RunState::Running {
            return;
        }

        if summary.attempted() >= self.expected {
            tracing::debug!("Stream dropped after every source was attempted");
            summary.complete();
        } else {
            tracing::debug!(
                "Run cancelled after {} attempted sources",
                summary.attempted()
            );
            summary.cancel();
        }
    }
}

impl fmt::Debug for RunStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunStream")
            .field("summary", &self.summary())
            .finish_non_exhaustive()
    }
}

/// Lock a summary, recovering the data if a previous holder panicked
pub(crate) fn lock(summary: &Mutex<RunSummary>) -> std::sync::MutexGuard<'_, RunSummary> {
    summary.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
