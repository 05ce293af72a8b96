//! Retry budget and backoff delays for chat requests

use std::time::Duration;

use crate::Error;

/// Retry policy for chat endpoint calls
///
/// `max_attempts` counts the first request, so the default of 3 means
/// one initial call plus two retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first request included
    pub max_attempts: u32,
    /// Wait before retrying a generic transient failure
    pub base_delay: Duration,
    /// Wait before retrying after a 429
    pub rate_limited_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            rate_limited_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` failed with `error`
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &Error) -> bool {
        attempt < self.max_attempts && error.is_transient()
    }

    /// Delay before the next attempt after `error`
    #[must_use]
    pub fn delay_for(&self, error: &Error) -> Duration {
        if error.is_too_many_requests() {
            self.rate_limited_delay
        } else {
            self.base_delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> Error {
        Error::Endpoint {
            status: Some(code),
            message: String::new(),
        }
    }

    #[test]
    fn default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.rate_limited_delay, Duration::from_secs(5));
    }

    #[test]
    fn rate_limit_uses_longer_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(&status(429)), Duration::from_secs(5));
        assert_eq!(policy.delay_for(&status(503)), Duration::from_secs(2));
    }

    #[test]
    fn retries_stop_at_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1, &status(500)));
        assert!(policy.should_retry(2, &status(429)));
        assert!(!policy.should_retry(3, &status(500)));
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, &status(400)));
        assert!(!policy.should_retry(1, &Error::Misconfigured("key".into())));
    }
}
