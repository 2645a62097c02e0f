//! Bounded retry with exponential backoff and jitter.
//!
//! Attempts run strictly one after another. A `Retryable` outcome with
//! attempts left sleeps `base * 2^index + jitter` and tries again; a `Fatal`
//! outcome returns at once; the last error is handed back unchanged.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    pub base_ms: u64,
    /// Upper bound (inclusive) of the random delay added to each backoff.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, base_ms: 400, jitter_ms: 100 }
    }
}

impl RetryPolicy {
    /// Deterministic part of the delay after attempt `index` (0-based).
    pub fn backoff(&self, index: u32) -> Duration {
        let factor = 1u64.checked_shl(index).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_ms.saturating_mul(factor))
    }

    pub fn delay(&self, index: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..=self.jitter_ms) };
        self.backoff(index) + Duration::from_millis(jitter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T, E> {
    Success(T),
    Retryable(E),
    Fatal(E),
}

impl<T, E> AttemptOutcome<T, E> {
    /// Sort a result into the three outcomes with `retryable` deciding errors.
    pub fn classify(result: Result<T, E>, retryable: impl FnOnce(&E) -> bool) -> Self {
        match result {
            Ok(v) => AttemptOutcome::Success(v),
            Err(e) if retryable(&e) => AttemptOutcome::Retryable(e),
            Err(e) => AttemptOutcome::Fatal(e),
        }
    }
}

/// Final result of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `op` until it succeeds, fails fatally, or the policy runs out.
///
/// `op` receives the 0-based attempt index.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> Retried<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut index = 0;
    loop {
        match op(index).await {
            AttemptOutcome::Success(v) => return Retried { result: Ok(v), attempts: index + 1 },
            AttemptOutcome::Fatal(e) => {
                tracing::warn!(attempt = index + 1, error = %e, "attempt failed, not retrying");
                return Retried { result: Err(e), attempts: index + 1 };
            }
            AttemptOutcome::Retryable(e) => {
                if index + 1 >= attempts {
                    tracing::warn!(attempts, error = %e, "all attempts failed");
                    return Retried { result: Err(e), attempts: index + 1 };
                }
                let delay = policy.delay(index);
                tracing::info!(
                    attempt = index + 1,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                sleeper.sleep(delay).await;
                index += 1;
            }
        }
    }
}
