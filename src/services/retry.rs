//! Bounded retry for page operations.
//!
//! Each fallible step is expressed as an [`Operation`] whose attempt reports a
//! tri-state [`Attempt`]: done, worth retrying, or hopeless. [`with_retry`]
//! applies one policy to all of them, pausing through the driver between
//! attempts so the wait counts as a settle point.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

use crate::config::RetryConfig;
use crate::driver::{DriverError, PageDriver};

#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    Retry(DriverError),
    Fail(DriverError),
}

impl<T> Attempt<T> {
    /// Classifies a driver result: session loss is terminal, the rest retryable.
    pub fn from_result(result: Result<T, DriverError>) -> Self {
        match result {
            Ok(value) => Self::Done(value),
            Err(e) if e.is_session_fatal() => Self::Fail(e),
            Err(e) => Self::Retry(e),
        }
    }
}

#[async_trait]
pub trait Operation: Send {
    type Output: Send;

    fn describe(&self) -> String;

    async fn attempt(&mut self, driver: &mut dyn PageDriver) -> Attempt<Self::Output>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    jitter_ratio: f32,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            jitter_ratio: config.jitter_ratio.clamp(0.0, 1.0),
        }
    }

    /// Same pacing, different attempt count.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Exponential backoff (`base * 2^(attempt - 1)`) capped at `backoff_max`,
    /// spread by up to `jitter_ratio`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let base = self.backoff_base.saturating_mul(factor).min(self.backoff_max);
        if self.jitter_ratio <= 0.0 || base.is_zero() {
            return base;
        }
        let jitter = rand::rng().random_range(0.0..=self.jitter_ratio);
        base.mul_f32(1.0 + jitter).min(self.backoff_max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

/// Runs `op` until it succeeds, fails terminally, or attempts run out.
pub async fn with_retry<O: Operation>(
    policy: &RetryPolicy,
    driver: &mut dyn PageDriver,
    mut op: O,
) -> Result<O::Output, DriverError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op.attempt(driver).await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fail(e) => return Err(e),
            Attempt::Retry(e) => {
                if attempt >= policy.max_attempts {
                    debug!(
                        operation = %op.describe(),
                        attempts = attempt,
                        error = %e,
                        "Giving up"
                    );
                    return Err(e);
                }
                debug!(
                    operation = %op.describe(),
                    attempt,
                    error = %e,
                    "Attempt failed, retrying"
                );
                driver.settle(policy.delay_for(attempt)).await;
            }
        }
    }
}
