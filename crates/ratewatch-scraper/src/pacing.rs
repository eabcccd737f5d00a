//! Randomized pauses and back-off schedules.
//!
//! Every wait between page actions and between hotels goes through here so
//! the timing can be shrunk to zero in tests.

use std::time::Duration;

use rand::Rng;

/// A closed interval of pause durations, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseRange {
    pub min: Duration,
    pub max: Duration,
}

impl PauseRange {
    /// Pauses between `min` and `max`; the bounds are swapped if inverted.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    #[must_use]
    pub fn from_secs(min_secs: u64, max_secs: u64) -> Self {
        Self::new(Duration::from_secs(min_secs), Duration::from_secs(max_secs))
    }

    /// No pause at all.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }

    /// Sleeps for a sampled duration and returns it.
    pub async fn pause(&self) -> Duration {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

/// Linearly growing delays: `first`, `first + step`, `first + 2 * step`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub first: Duration,
    pub step: Duration,
}

impl LinearBackoff {
    #[must_use]
    pub fn new(first: Duration, step: Duration) -> Self {
        Self { first, step }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Delay before the zero-based `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.first.saturating_add(self.step.saturating_mul(attempt))
    }
}
