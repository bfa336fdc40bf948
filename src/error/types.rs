//! Credential, session and pool error types

use std::time::Duration;
use thiserror::Error;

/// Failures while resolving a credential from its source.
///
/// These surface immediately to the caller; once a source is selected there is
/// no silent fallback to another one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Service discovery error: {0}")]
    Discovery(String),

    #[error("No {service} service available with tag '{tag}'")]
    NoServiceAvailable { service: String, tag: String },

    #[error("Unable to load secret store token from configured paths")]
    NoTokenFound,

    #[error("Secret read error: {0}")]
    SecretRead(String),

    #[error("Malformed secret at '{key}': {reason}")]
    MalformedSecret { key: String, reason: String },
}

impl CredentialError {
    pub(crate) fn malformed(key: &str, reason: impl Into<String>) -> Self {
        CredentialError::MalformedSecret {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// A single failed attempt at constructing a service handle.
///
/// Always retryable from the pool's point of view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unable to resolve credentials for session: {0}")]
    Credentials(String),

    #[error("Credentials expired or invalid")]
    Expired,

    #[error("Session setup timed out after {0:?}")]
    Timeout(Duration),
}

impl From<CredentialError> for SessionError {
    fn from(err: CredentialError) -> Self {
        SessionError::Credentials(err.to_string())
    }
}

/// Terminal failures from the service pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Unable to build service handle after {attempts} attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: SessionError },

    #[error("Service handle construction cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl PoolError {
    /// Number of construction attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            PoolError::ExhaustedRetries { attempts, .. } | PoolError::Cancelled { attempts } => {
                *attempts
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_messages() {
        let err = CredentialError::NoServiceAvailable {
            service: "vault".to_string(),
            tag: "active".to_string(),
        };
        assert_eq!(err.to_string(), "No vault service available with tag 'active'");

        let err = CredentialError::malformed("secret/s3", "missing field 's3id'");
        assert!(err.to_string().contains("secret/s3"));
        assert!(err.to_string().contains("s3id"));
    }

    #[test]
    fn test_session_error_from_credential_error() {
        let err: SessionError = CredentialError::SecretRead("connection refused".to_string()).into();
        assert!(matches!(err, SessionError::Credentials(ref msg) if msg.contains("connection refused")));
    }

    #[test]
    fn test_pool_error_attempts() {
        let err = PoolError::ExhaustedRetries {
            attempts: 50,
            last_error: SessionError::Expired,
        };
        assert_eq!(err.attempts(), 50);
        assert!(err.to_string().contains("50 attempts"));

        assert_eq!(PoolError::Cancelled { attempts: 3 }.attempts(), 3);
    }
}
