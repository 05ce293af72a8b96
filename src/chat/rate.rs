//! Adaptive request spacing for the chat endpoint

use std::time::Duration;

use tokio::time::Instant;

/// Spacing floor, and the starting interval
pub const MIN_INTERVAL_FLOOR: Duration = Duration::from_millis(1000);

/// Upper bound for the interval after repeated 429s
pub const MIN_INTERVAL_CAP: Duration = Duration::from_millis(10_000);

/// Amount the interval shrinks after each successful reply
pub const MIN_INTERVAL_DECAY: Duration = Duration::from_millis(1000);

/// Minimum spacing between outbound chat requests
///
/// Owned by a single pipeline. The interval doubles on every rate-limit
/// rejection (capped at [`MIN_INTERVAL_CAP`]) and decays back toward
/// [`MIN_INTERVAL_FLOOR`] on success.
#[derive(Debug, Clone)]
pub struct RateState {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl Default for RateState {
    fn default() -> Self {
        Self::new()
    }
}

impl RateState {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_interval(MIN_INTERVAL_FLOOR)
    }

    /// Start from a specific interval, clamped to the floor and cap
    #[must_use]
    pub const fn with_interval(interval: Duration) -> Self {
        let min_interval = if interval.as_millis() < MIN_INTERVAL_FLOOR.as_millis() {
            MIN_INTERVAL_FLOOR
        } else if interval.as_millis() > MIN_INTERVAL_CAP.as_millis() {
            MIN_INTERVAL_CAP
        } else {
            interval
        };

        Self {
            last_request: None,
            min_interval,
        }
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    #[must_use]
    pub const fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// How long a request issued at `now` must still wait
    #[must_use]
    pub fn delay_at(&self, now: Instant) -> Duration {
        self.last_request.map_or(Duration::ZERO, |last| {
            let elapsed = now.saturating_duration_since(last);
            self.min_interval.saturating_sub(elapsed)
        })
    }

    /// Record that a request left at `at`
    pub const fn record_request(&mut self, at: Instant) {
        self.last_request = Some(at);
    }

    /// Sleep until the interval since the previous request has passed
    ///
    /// Returns the wait that was applied. The sleep is a timer await, so
    /// other tasks keep running.
    pub async fn wait_turn(&mut self) -> Duration {
        let delay = self.delay_at(Instant::now());
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis(), "spacing chat request");
            tokio::time::sleep(delay).await;
        }
        delay
    }

    /// Double the interval after a 429, returning the new value
    pub fn on_rate_limited(&mut self) -> Duration {
        self.min_interval = self.min_interval.saturating_mul(2).min(MIN_INTERVAL_CAP);
        self.min_interval
    }

    /// Shrink the interval after a successful reply, returning the new value
    pub fn on_success(&mut self) -> Duration {
        self.min_interval = self
            .min_interval
            .saturating_sub(MIN_INTERVAL_DECAY)
            .max(MIN_INTERVAL_FLOOR);
        self.min_interval
    }
}
