//! Service handle and factory traits

use crate::error::SessionError;
use async_trait::async_trait;

/// A ready-to-use client bound to a credential provider
pub trait ServiceHandle: Send + 'static {
    /// Identity assigned by the pool at construction
    fn id(&self) -> u64;

    /// Whether the bound credential is stale
    fn credentials_expired(&self) -> bool;
}

/// Builds service handles for a [`ServicePool`](super::ServicePool).
///
/// One call is one attempt: set up a fresh session and bind a handle to it.
/// Retry, backoff and the expiry check are the pool's job.
#[async_trait]
pub trait HandleFactory: Send + Sync {
    type Handle: ServiceHandle;

    async fn create(&self, id: u64) -> Result<Self::Handle, SessionError>;
}
