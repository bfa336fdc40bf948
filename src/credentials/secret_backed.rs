//! Secret-store backed credentials

use super::{Credential, CredentialProvider};
use crate::error::CredentialError;
use crate::secrets::{SecretRecord, SecretStore};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Names of the record fields holding the access key id and the secret key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFields {
    pub id_field: String,
    pub key_field: String,
}

impl Default for SecretFields {
    fn default() -> Self {
        Self::new("s3id", "s3key")
    }
}

impl SecretFields {
    pub fn new(id_field: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            key_field: key_field.into(),
        }
    }
}

/// Reads the credential from a secret-store record on every fetch.
///
/// The store is trusted to serve current values, so there is no local freshness
/// window: `expire` is a no-op and `is_expired` is always false.
pub struct SecretBackedProvider {
    store: Arc<dyn SecretStore>,
    secret_key: String,
    fields: SecretFields,
}

impl SecretBackedProvider {
    pub fn new(
        store: Arc<dyn SecretStore>,
        secret_key: impl Into<String>,
        fields: SecretFields,
    ) -> Result<Self, CredentialError> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(CredentialError::Configuration(
                "secret key path cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            store,
            secret_key,
            fields,
        })
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    fn field<'a>(&self, record: &'a SecretRecord, name: &str) -> Result<&'a str, CredentialError> {
        match record.get(name) {
            None | Some(Value::Null) => Err(CredentialError::malformed(
                &self.secret_key,
                format!("missing field '{}'", name),
            )),
            Some(Value::String(value)) if value.is_empty() => Err(CredentialError::malformed(
                &self.secret_key,
                format!("field '{}' is empty", name),
            )),
            Some(Value::String(value)) => Ok(value),
            Some(_) => Err(CredentialError::malformed(
                &self.secret_key,
                format!("field '{}' is not a string", name),
            )),
        }
    }
}

#[async_trait]
impl CredentialProvider for SecretBackedProvider {
    fn name(&self) -> &'static str {
        "vault"
    }

    async fn fetch(&self) -> Result<Credential, CredentialError> {
        let record = self
            .store
            .read_key(&self.secret_key)
            .await?
            .ok_or_else(|| CredentialError::malformed(&self.secret_key, "no secret data"))?;

        let access_key_id = self.field(&record, &self.fields.id_field)?;
        let secret_key = self.field(&record, &self.fields.key_field)?;

        tracing::debug!(
            secret_key = %self.secret_key,
            access_key_id = %access_key_id,
            "Read credentials from secret store"
        );

        Ok(Credential::new(access_key_id, secret_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StaticStore {
        response: Result<Option<SecretRecord>, CredentialError>,
        reads: AtomicU32,
    }

    impl StaticStore {
        fn with_record(value: Value) -> Arc<Self> {
            let record = match value {
                Value::Object(map) => map,
                _ => unreachable!("test records are objects"),
            };
            Arc::new(Self {
                response: Ok(Some(record)),
                reads: AtomicU32::new(0),
            })
        }

        fn with_response(response: Result<Option<SecretRecord>, CredentialError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                reads: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl SecretStore for StaticStore {
        async fn read_key(&self, _key: &str) -> Result<Option<SecretRecord>, CredentialError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn provider(store: Arc<StaticStore>) -> SecretBackedProvider {
        SecretBackedProvider::new(store, "secret/s3", SecretFields::default()).unwrap()
    }

    #[tokio::test]
    async fn test_well_formed_record() {
        let store = StaticStore::with_record(json!({ "s3id": "AKIAEXAMPLE", "s3key": "abc123" }));
        let cred = provider(store).fetch().await.unwrap();
        assert_eq!(cred, Credential::new("AKIAEXAMPLE", "abc123"));
    }

    #[tokio::test]
    async fn test_custom_field_names() {
        let store = StaticStore::with_record(json!({ "id": "AKIAEXAMPLE", "key": "abc123" }));
        let provider =
            SecretBackedProvider::new(store, "secret/s3", SecretFields::new("id", "key")).unwrap();

        let cred = provider.fetch().await.unwrap();
        assert_eq!(cred.access_key_id(), "AKIAEXAMPLE");
        assert_eq!(cred.secret_key(), "abc123");
    }

    #[tokio::test]
    async fn test_malformed_records_never_yield_partial_credentials() {
        let cases = [
            json!({ "s3key": "abc123" }),
            json!({ "s3id": "AKIAEXAMPLE" }),
            json!({ "s3id": "", "s3key": "abc123" }),
            json!({ "s3id": "AKIAEXAMPLE", "s3key": "" }),
            json!({ "s3id": 42, "s3key": "abc123" }),
            json!({ "s3id": "AKIAEXAMPLE", "s3key": null }),
            json!({}),
        ];

        for record in cases {
            let store = StaticStore::with_record(record.clone());
            let err = provider(store).fetch().await.unwrap_err();
            assert!(
                matches!(err, CredentialError::MalformedSecret { .. }),
                "expected MalformedSecret for {record}, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_absent_record_is_malformed() {
        let store = StaticStore::with_response(Ok(None));
        let err = provider(store).fetch().await.unwrap_err();
        assert!(matches!(err, CredentialError::MalformedSecret { ref key, .. } if key == "secret/s3"));
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let store = StaticStore::with_response(Err(CredentialError::SecretRead("503".to_string())));
        let err = provider(store).fetch().await.unwrap_err();
        assert_eq!(err, CredentialError::SecretRead("503".to_string()));
    }

    #[tokio::test]
    async fn test_every_fetch_is_a_live_read() {
        let store = StaticStore::with_record(json!({ "s3id": "AKIAEXAMPLE", "s3key": "abc123" }));
        let provider = provider(store.clone());

        provider.fetch().await.unwrap();
        provider.expire();
        provider.fetch().await.unwrap();

        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
        assert!(!provider.is_expired());
    }

    #[test]
    fn test_empty_secret_key_rejected() {
        let store = StaticStore::with_response(Ok(None));
        let result = SecretBackedProvider::new(store, "  ", SecretFields::default());
        assert!(matches!(result, Err(CredentialError::Configuration(_))));
    }
}
