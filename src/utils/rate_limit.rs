//! Per-source minimum-interval rate limiter.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Minimum-interval throttle owned by a single source instance.
///
/// `acquire` waits until at least `interval` has passed since the previous
/// `acquire` on the same limiter returned. The first call never waits. The
/// clock is never shared: two sources, or two instances of the same source,
/// each carry their own limiter.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with a fixed minimum interval between calls
    pub fn new(interval: Duration) -> Self {
        debug!("Created rate limiter: one request every {:?}", interval);
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Create a limiter from an interval in seconds; negative or non-finite values mean no delay
    pub fn from_secs_f64(seconds: f64) -> Self {
        let interval = if seconds.is_finite() && seconds > 0.0 {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::ZERO
        };
        Self::new(interval)
    }

    /// Pick the interval depending on whether a provider credential is configured
    pub fn for_credential(has_credential: bool, with: Duration, without: Duration) -> Self {
        Self::new(if has_credential { with } else { without })
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The configured minimum interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a request is allowed, then record the call time
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                debug!("Rate limiter: waiting {}ms", wait.as_millis());
                sleep(wait).await;
            }
        }

        *last_call = Some(Instant::now());
    }

    /// Time left before `acquire` would return immediately.
    ///
    /// Returns `None` when ready. While another caller holds the limiter the
    /// full interval is reported.
    pub fn time_until_ready(&self) -> Option<Duration> {
        let last_call = match self.last_call.try_lock() {
            Ok(guard) => *guard,
            Err(_) => return Some(self.interval),
        };

        last_call.and_then(|previous| {
            let elapsed = previous.elapsed();
            (elapsed < self.interval).then(|| self.interval - elapsed)
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
