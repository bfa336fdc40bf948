//! Service Pool Implementation
//!
//! A bounded pool of service handles. Checkout pops without blocking and falls
//! back to building a new handle; return pushes without blocking and drops the
//! handle when the pool is full.

use super::handle::{HandleFactory, ServiceHandle};
use crate::error::{PoolError, SessionError};
use crate::utils::{retry_with_backoff, with_timeout, RetryConfig, RetryError, TimeoutError};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Pool Configuration
// ============================================================================

/// Configuration for service pool behavior
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of idle handles kept
    pub capacity: usize,
    /// Backoff schedule and attempt budget for building handles
    pub retry: RetryConfig,
    /// Upper bound on a single build attempt
    pub session_timeout: Duration,
    /// Re-check credential expiry on handles taken from the pool
    pub revalidate_on_checkout: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            retry: RetryConfig::default(),
            session_timeout: Duration::from_secs(60),
            revalidate_on_checkout: false,
        }
    }
}

impl PoolConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_revalidate_on_checkout(mut self, revalidate: bool) -> Self {
        self.revalidate_on_checkout = revalidate;
        self
    }
}

// ============================================================================
// Service Pool
// ============================================================================

#[derive(Debug, Default)]
struct PoolCounters {
    built: AtomicU64,
    reused: AtomicU64,
    discarded: AtomicU64,
}

/// A bounded pool of service handles built by a [`HandleFactory`].
///
/// Safe to share between tasks without external locking. Concurrent misses on
/// an empty pool each build their own handle.
pub struct ServicePool<F: HandleFactory> {
    factory: F,
    config: PoolConfig,
    sender: Sender<F::Handle>,
    receiver: Receiver<F::Handle>,
    next_id: AtomicU64,
    counters: PoolCounters,
}

impl<F: HandleFactory> ServicePool<F> {
    pub fn new(factory: F, config: PoolConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(config.capacity);
        Self {
            factory,
            config,
            sender,
            receiver,
            next_id: AtomicU64::new(1),
            counters: PoolCounters::default(),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Take a pooled handle, or build a new one if the pool is empty.
    ///
    /// Pooled handles are returned without re-checking expiry unless
    /// `revalidate_on_checkout` is set.
    pub async fn get_handle(&self, cancel: &CancellationToken) -> Result<F::Handle, PoolError> {
        loop {
            match self.receiver.try_recv() {
                Ok(handle) => {
                    if self.config.revalidate_on_checkout && handle.credentials_expired() {
                        self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(handle_id = handle.id(), "Discarding pooled service with expired credentials");
                        continue;
                    }

                    self.counters.reused.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(handle_id = handle.id(), "Providing service from the pool");
                    return Ok(handle);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        tracing::debug!("Generating new service");
        self.build_handle(cancel).await
    }

    /// Put a handle back for reuse, dropping it if the pool is full
    pub fn return_handle(&self, handle: F::Handle) {
        let id = handle.id();
        match self.sender.try_send(handle) {
            Ok(()) => {
                tracing::debug!(handle_id = id, "Returning service to the pool");
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(handle_id = id, "Discarding service as pool is full");
            }
        }
    }

    /// Build a new handle, retrying with backoff until it succeeds, the attempt
    /// budget runs out, or `cancel` fires.
    pub async fn build_handle(&self, cancel: &CancellationToken) -> Result<F::Handle, PoolError> {
        let outcome =
            retry_with_backoff(&self.config.retry, cancel, || self.attempt_build()).await;

        match outcome.result {
            Ok(handle) => {
                self.counters.built.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    handle_id = handle.id(),
                    attempts = outcome.attempts,
                    "Created new service"
                );
                Ok(handle)
            }
            Err(RetryError::Exhausted(last_error)) => {
                tracing::error!(
                    attempts = outcome.attempts,
                    error = %last_error,
                    "Unable to create service after exhausting retries"
                );
                Err(PoolError::ExhaustedRetries {
                    attempts: outcome.attempts,
                    last_error,
                })
            }
            Err(RetryError::Cancelled) => {
                tracing::warn!(attempts = outcome.attempts, "Service creation cancelled");
                Err(PoolError::Cancelled {
                    attempts: outcome.attempts,
                })
            }
        }
    }

    async fn attempt_build(&self) -> Result<F::Handle, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let handle = with_timeout(self.config.session_timeout, self.factory.create(id))
            .await
            .map_err(|e| match e {
                TimeoutError::Timeout(after) => SessionError::Timeout(after),
                TimeoutError::Inner(err) => err,
            })?;

        if handle.credentials_expired() {
            return Err(SessionError::Expired);
        }

        Ok(handle)
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.config.capacity,
            idle: self.receiver.len(),
            built: self.counters.built.load(Ordering::Relaxed),
            reused: self.counters.reused.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Pool Statistics
// ============================================================================

/// Statistics about a service pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum number of idle handles
    pub capacity: usize,
    /// Handles currently waiting in the pool
    pub idle: usize,
    /// Handles successfully built
    pub built: u64,
    /// Checkouts served from the pool
    pub reused: u64,
    /// Handles dropped (pool full, or expired on checkout)
    pub discarded: u64,
}

// ============================================================================
// Tests
// ============================================================================
