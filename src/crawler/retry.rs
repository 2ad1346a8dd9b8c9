//! Retry policy for transient fetch failures
//!
//! The policy is a plain value handed to the fetcher, so it can be built from
//! configuration and exercised on its own without a network.

use crate::crawler::fetcher::FetchError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `base * attempt`
    Linear,

    /// `base * 2^(attempt - 1)`
    #[default]
    Exponential,
}

/// Bounded retry with backoff
///
/// `attempt` indices start at 1. After the first failed attempt the worker
/// sleeps `delay_for(1)`, after the second `delay_for(2)`, and so on, until
/// `max_retries` retries have been spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,

    /// Backoff base multiplier
    pub base: Duration,

    pub backoff: Backoff,

    /// Upper bound on any single delay
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_secs(1),
            backoff: Backoff::Exponential,
            max_delay: Some(Duration::from_secs(5)),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: Duration, backoff: Backoff) -> Self {
        Self {
            max_retries,
            base,
            backoff,
            max_delay: None,
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, Backoff::Linear)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let raw = match self.backoff {
            Backoff::Linear => self.base.saturating_mul(attempt),
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                self.base.saturating_mul(factor)
            }
        };

        match self.max_delay {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    /// Runs `op` until it succeeds, fails terminally, or retries run out
    ///
    /// `op` receives the 1-based attempt index. Only errors for which
    /// [`FetchError::is_retryable`] holds are retried; anything else is
    /// returned as-is after a single attempt. When retries are exhausted the
    /// last error is wrapped in [`FetchError::Exhausted`].
    ///
    /// The cancellation token is checked before every attempt and during every
    /// backoff sleep, so a stop request never waits for the remaining retries.
    /// An attempt that is already in flight is allowed to finish.
    pub async fn run<T, F, Fut>(
        &self,
        url: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    "Giving up on {} after {} attempts: {}",
                    url,
                    attempt,
                    error
                );
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                attempt,
                max_attempts,
                url,
                error,
                delay
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
