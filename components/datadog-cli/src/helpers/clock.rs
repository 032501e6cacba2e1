// External crates
use chrono::Utc;

/// Source of "now" for data point timestamps, in whole epoch seconds.
pub trait Clock {
    fn now_epoch_seconds(&self) -> f64;
}

/// Wall-clock time, truncated to the second the way Datadog buckets points.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> f64 {
        Utc::now().timestamp() as f64
    }
}

/// A clock pinned to a single instant.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub f64);

#[cfg(test)]
impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> f64 {
        self.0
    }
}
