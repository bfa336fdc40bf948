//! Utility modules
//!
//! Retry with backoff and timeout handling.

pub mod retry;
pub mod timeout;

pub use retry::{retry_with_backoff, RetryConfig, RetryError, RetryResult};
pub use timeout::{with_timeout, TimeoutConfig, TimeoutError};
