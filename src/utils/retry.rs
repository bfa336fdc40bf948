//! Retry utilities with exponential backoff
//!
//! Operations are attempted up to a fixed budget. Between attempts the caller
//! sleeps for an exponentially growing, capped, jittered delay. Every attempt and
//! every sleep races a cancellation token.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub initial_delay: Duration,

    /// Maximum delay between attempts (caps exponential growth)
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    pub multiplier: f64,

    /// Whether to randomize each delay between `initial_delay` and the computed delay
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5 * 60),
            multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Un-jittered delay after the given failed attempt (0-indexed).
    ///
    /// Non-decreasing in `attempt` and never above `max_delay`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let max_ms = self.max_delay.as_millis() as f64;

        // powi overflows to inf for large exponents; min() keeps it at the cap
        let delay_ms = if delay_ms.is_finite() {
            delay_ms.min(max_ms)
        } else {
            max_ms
        };

        Duration::from_millis(delay_ms as u64)
    }

    /// Delay to sleep after the given failed attempt (0-indexed)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let floor = self.initial_delay.min(base);

        if self.use_jitter && base > floor {
            let jittered_ms =
                rand::thread_rng().gen_range(floor.as_millis() as u64..=base.as_millis() as u64);
            Duration::from_millis(jittered_ms)
        } else {
            base
        }
    }
}

/// Why a retried operation did not produce a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt in the budget failed; carries the last error
    Exhausted(E),

    /// The cancellation token fired before the operation succeeded
    Cancelled,
}

/// Result of a retry operation
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success, or why there is none)
    pub result: Result<T, RetryError<E>>,

    /// Number of attempts started
    pub attempts: u32,

    /// Total time spent sleeping between attempts
    pub total_delay: Duration,
}

/// Execute an async operation with retry logic
///
/// The operation runs at most `config.max_attempts` times (at least once). No
/// sleep follows the final failed attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts = 0;
    let mut total_delay = Duration::ZERO;

    loop {
        if cancel.is_cancelled() {
            return RetryResult {
                result: Err(RetryError::Cancelled),
                attempts,
                total_delay,
            };
        }

        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = operation() => Some(outcome),
        };

        let err = match outcome {
            None => {
                return RetryResult {
                    result: Err(RetryError::Cancelled),
                    attempts,
                    total_delay,
                };
            }
            Some(Ok(value)) => {
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_delay,
                };
            }
            Some(Err(err)) => err,
        };

        if attempts >= config.max_attempts {
            return RetryResult {
                result: Err(RetryError::Exhausted(err)),
                attempts,
                total_delay,
            };
        }

        let delay = config.calculate_delay(attempts - 1);
        total_delay += delay;

        tracing::warn!(
            attempt = attempts,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Attempt failed, backing off before retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return RetryResult {
                    result: Err(RetryError::Cancelled),
                    attempts,
                    total_delay,
                };
            }
            _ = sleep(delay) => {}
        }
    }
}
