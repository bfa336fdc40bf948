//! Timeout utilities
//!
//! Timeout configuration for outbound calls and handle construction, plus a
//! helper that bounds a fallible future.

use std::time::Duration;

/// Timeout configuration for different operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// TCP connect timeout for discovery and secret-store calls (default: 10s)
    pub connect_timeout: Duration,

    /// Whole-request timeout for discovery and secret-store calls (default: 30s)
    pub request_timeout: Duration,

    /// Upper bound on a single service handle construction attempt (default: 60s)
    pub session_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            session_timeout: Duration::from_secs(60),
        }
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Create config from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_secs("CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("SESSION_TIMEOUT_SECS") {
            config.session_timeout = Duration::from_secs(secs);
        }

        config
    }
}

fn env_secs(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|val| val.parse::<u64>().ok())
}

/// Apply timeout to an async operation
pub async fn with_timeout<T, E>(
    timeout: Duration,
    future: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, TimeoutError<E>> {
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TimeoutError::Inner(err)),
        Err(_) => Err(TimeoutError::Timeout(timeout)),
    }
}

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E> {
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Inner(E),
}
