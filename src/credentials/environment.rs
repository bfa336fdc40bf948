//! Environment-sourced credentials

use super::{Credential, CredentialProvider};
use crate::error::CredentialError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Access key variable names, in lookup order
pub const ACCESS_KEY_ID_VARS: [&str; 2] = ["AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY"];

/// Secret key variable names, in lookup order
pub const SECRET_KEY_VARS: [&str; 2] = ["AWS_SECRET_ACCESS_KEY", "AWS_SECRET_KEY"];

/// Reads credentials from `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`
/// (or the legacy `AWS_ACCESS_KEY`/`AWS_SECRET_KEY`).
///
/// Environment credentials are assumed always current: `expire` is a no-op and
/// `is_expired` is always false.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentProvider {
    /// Fixed variables; `None` reads the process environment on every fetch
    vars: Option<HashMap<String, String>>,
}

impl EnvironmentProvider {
    /// Provider backed by the process environment
    pub fn new() -> Self {
        Self { vars: None }
    }

    /// Provider backed by a fixed set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Provider backed by the process environment, checked once up front
    pub fn load() -> Result<Self, CredentialError> {
        let provider = Self::new();
        provider.read()?;
        Ok(provider)
    }

    fn lookup(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| {
            let value = match &self.vars {
                Some(vars) => vars.get(*name).cloned(),
                None => std::env::var(name).ok(),
            };
            value.filter(|v| !v.is_empty())
        })
    }

    fn read(&self) -> Result<Credential, CredentialError> {
        let access_key_id = self.lookup(&ACCESS_KEY_ID_VARS).ok_or_else(|| {
            CredentialError::Configuration(format!(
                "{} not found in environment",
                ACCESS_KEY_ID_VARS[0]
            ))
        })?;
        let secret_key = self.lookup(&SECRET_KEY_VARS).ok_or_else(|| {
            CredentialError::Configuration(format!("{} not found in environment", SECRET_KEY_VARS[0]))
        })?;

        Ok(Credential::new(access_key_id, secret_key))
    }
}

#[async_trait]
impl CredentialProvider for EnvironmentProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn fetch(&self) -> Result<Credential, CredentialError> {
        self.read()
    }
}
