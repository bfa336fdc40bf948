//! Caching wrapper around any credential provider

use super::{Credential, CredentialProvider};
use crate::error::CredentialError;
use async_trait::async_trait;
use std::sync::RwLock;

/// Holds the last credential fetched from the inner provider until `expire`.
///
/// Starts out expired. The cached value is swapped whole under a lock, so
/// concurrent readers see either the old credential or the new one.
pub struct CachedProvider<P> {
    inner: P,
    cached: RwLock<Option<Credential>>,
}

impl<P: CredentialProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cached: RwLock::new(None),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn current(&self) -> Option<Credential> {
        match self.cached.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store(&self, credential: Option<Credential>) {
        match self.cached.write() {
            Ok(mut guard) => *guard = credential,
            Err(poisoned) => *poisoned.into_inner() = credential,
        }
    }
}

#[async_trait]
impl<P: CredentialProvider> CredentialProvider for CachedProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch(&self) -> Result<Credential, CredentialError> {
        if !self.inner.is_expired() {
            if let Some(credential) = self.current() {
                return Ok(credential);
            }
        }

        let credential = self.inner.fetch().await?;
        self.store(Some(credential.clone()));
        tracing::debug!(provider = self.inner.name(), "Refreshed cached credentials");
        Ok(credential)
    }

    fn expire(&self) {
        self.store(None);
        self.inner.expire();
    }

    fn is_expired(&self) -> bool {
        self.current().is_none() || self.inner.is_expired()
    }
}
