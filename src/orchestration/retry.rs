//! # Conflict Retry
//!
//! Bounded exponential backoff around operations that can lose an optimistic
//! `lock_version` race. Only [`WorkflowError::is_retryable`] errors are
//! retried; everything else returns immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ConflictRetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ConflictRetryPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_retries: config.max_conflict_retries,
            base_delay: config.backoff_base(),
            max_delay: config.backoff_max(),
        }
    }

    /// Policy that surfaces the first conflict
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): base * 2^attempt, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// exhausts the retry budget
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> WorkflowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_fn().await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        operation = operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after concurrency conflict"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err @ WorkflowError::ConcurrencyConflict { .. }) => {
                    warn!(
                        operation = operation,
                        attempts = attempt + 1,
                        "Concurrency conflict persisted after retries"
                    );
                    return Err(err);
                }
                result => return result,
            }
        }
    }
}
