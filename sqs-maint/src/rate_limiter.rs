//! A blocking gate that lets through at most `R` operations per second.
//!
//! Permits are handed out on a fixed schedule of one every `1/R` seconds. An idle limiter does
//! not accumulate credit beyond a single permit, so the first `acquire` after a pause returns
//! immediately and the next one waits a full interval.

use std::time::Duration;

use tokio::time::Instant;

use crate::ConfigError;

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_free: Option<Instant>,
}

impl RateLimiter {
    pub fn new(permits_per_second: f64) -> Result<Self, ConfigError> {
        let interval = interval_for(permits_per_second)
            .ok_or_else(|| ConfigError::InvalidRate(permits_per_second.to_string()))?;

        Ok(Self {
            interval,
            next_free: None,
        })
    }

    pub fn permits_per_second(&self) -> f64 {
        1.0 / self.interval.as_secs_f64()
    }

    /// Waits until a permit is available and takes it. Returns how long the caller was held.
    pub async fn acquire(&mut self) -> Duration {
        let now = Instant::now();
        let ready_at = match self.next_free {
            Some(next_free) if next_free > now => next_free,
            _ => now,
        };
        self.next_free = Some(ready_at + self.interval);

        let waited = ready_at - now;
        if !waited.is_zero() {
            tracing::trace!("RateLimiter: waiting {waited:?} for a permit");
            tokio::time::sleep_until(ready_at).await;
        }
        waited
    }
}

/// Time between two permits, or `None` when `permits_per_second` is not positive and finite or
/// is so small that the interval does not fit in a [`Duration`].
pub(crate) fn interval_for(permits_per_second: f64) -> Option<Duration> {
    if !permits_per_second.is_finite() || permits_per_second <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / permits_per_second).ok()
}
