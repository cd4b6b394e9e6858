use std::time::Duration;

use stx_api_client::Error;
use tryhard::{
    backoff_strategies::BackoffStrategy,
    RetryPolicy,
};

/// A bounded number of attempts with a fixed pause between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedRetry {
    /// Attempts in total, including the first. Zero is treated as one.
    pub attempts: u32,
    pub delay: Duration,
}

impl FixedRetry {
    /// The number of retries after the first attempt.
    #[must_use]
    pub fn retries(self) -> u32 {
        self.attempts.max(1) - 1
    }
}

impl Default for FixedRetry {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(2_000),
        }
    }
}

/// Retries only requests that never got a response.
pub(crate) struct TransportRetryStrategy {
    delay: Duration,
}

impl TransportRetryStrategy {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
        }
    }
}

impl<'a> BackoffStrategy<'a, Error> for TransportRetryStrategy {
    type Output = RetryPolicy;

    fn delay(&mut self, _attempt: u32, error: &'a Error) -> Self::Output {
        if error.is_transport() {
            RetryPolicy::Delay(self.delay)
        } else {
            RetryPolicy::Break
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_still_tries_once() {
        let retry = FixedRetry {
            attempts: 0,
            delay: Duration::ZERO,
        };
        assert_eq!(0, retry.retries());
        assert_eq!(2, FixedRetry::default().retries());
    }
}
