//! Per-run success/failure bookkeeping.

use serde::Serialize;
use std::collections::BTreeMap;

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No run has started yet
    #[default]
    Idle,
    /// Sources are still being attempted
    Running,
    /// Every source was attempted
    Completed,
    /// The consumer stopped the run before every source was attempted
    Cancelled,
}

/// Report of which sources succeeded or failed in a run.
///
/// Each attempted source appears in exactly one of `successful` and
/// `failed`. Sources that were never attempted, because they were not
/// selected or the run was cancelled first, appear in neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub state: RunState,

    /// Names of sources that returned results (possibly zero) or hit the cache
    pub successful: Vec<String>,

    /// Names of sources whose fetch failed
    pub failed: Vec<String>,

    /// Failure message per failed source
    pub failure_reasons: BTreeMap<String, String>,

    /// Sources served from the cache
    pub cache_hits: usize,

    /// Unique records handed to the consumer
    pub records_yielded: usize,

    /// Records dropped as duplicates of an earlier record
    pub duplicates_dropped: usize,

    /// Records dropped by the query filters
    pub filtered_out: usize,
}

impl RunSummary {
    /// A fresh summary for a run that is about to start
    pub fn running() -> Self {
        Self {
            state: RunState::Running,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, source: &str, from_cache: bool) {
        self.successful.push(source.to_string());
        if from_cache {
            self.cache_hits += 1;
        }
    }

    pub fn record_failure(&mut self, source: &str, reason: impl Into<String>) {
        self.failed.push(source.to_string());
        self.failure_reasons
            .insert(source.to_string(), reason.into());
    }

    /// Mark the run as finished after every source was attempted
    pub fn complete(&mut self) {
        self.state = RunState::Completed;
    }

    /// Mark the run as stopped early. Finished runs are left untouched.
    pub fn cancel(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Cancelled;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Number of sources attempted so far
    pub fn attempted(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// True when at least one source was attempted and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.failed.is_empty() && self.successful.is_empty()
    }

    /// Why a source failed, if it did
    pub fn failure_reason(&self, source: &str) -> Option<&str> {
        self.failure_reasons.get(source).map(String::as_str)
    }
}
