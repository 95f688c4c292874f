//! Best-effort public key provisioning.
//!
//! The public key is pushed to every provider referenced by a step's input
//! schema. Failures are isolated per provider: a missing token, an unknown
//! provider or a failed upload is logged and the remaining providers are
//! still provisioned.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::{access_token_for, CredentialMap, InputSchema, InputValues, ProviderKind};
use crate::error::Result;
use crate::port::ProviderRegistry;

pub struct CredentialProvisioner {
    providers: ProviderRegistry,
    key_name: String,
}

impl CredentialProvisioner {
    #[must_use]
    pub fn new(providers: ProviderRegistry, key_name: impl Into<String>) -> Self {
        Self {
            providers,
            key_name: key_name.into(),
        }
    }

    /// Push `public_key` to every provider referenced by `schema`.
    ///
    /// Returns the provider-assigned key identifiers for the providers that
    /// accepted the key.
    pub async fn provision(
        &self,
        public_key: &str,
        schema: &InputSchema,
        inputs: &InputValues,
    ) -> CredentialMap {
        let mut credentials = CredentialMap::new();

        let referenced: BTreeSet<&str> = schema
            .values()
            .filter_map(|def| def.provider.as_deref())
            .collect();

        for tag in referenced {
            let Ok(provider) = tag.parse::<ProviderKind>() else {
                warn!(provider = %tag, "no handler for provider, skipping key upload");
                continue;
            };

            let Some(token) = access_token_for(schema, inputs, provider) else {
                warn!(provider = %provider, "no access token supplied, skipping key upload");
                continue;
            };

            let Some(client) = self.providers.get(provider) else {
                warn!(provider = %provider, "no client registered, skipping key upload");
                continue;
            };

            match client.upload_key(&self.key_name, public_key, token).await {
                Ok(id) => {
                    info!(provider = %provider, key_id = %id, "public key provisioned");
                    credentials.insert(provider, id);
                }
                Err(e) => {
                    warn!(provider = %provider, error = %e, "public key upload failed");
                }
            }
        }

        credentials
    }
}

/// Read the public key material from disk.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read.
pub async fn read_public_key(path: &Path) -> Result<String> {
    let key = tokio::fs::read_to_string(path).await?;
    Ok(key.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::InputDef;
    use crate::testkit::domain::{access_token, input, schema};
    use crate::testkit::provider::{FakeProvider, ProviderCall};
    use serde_json::json;

    fn provisioner(provider: FakeProvider) -> CredentialProvisioner {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(provider));
        CredentialProvisioner::new(registry, "tofuhub")
    }

    #[tokio::test]
    async fn uploads_once_per_provider() {
        let provider = FakeProvider::new().with_key_id("4242");
        let calls = provider.calls();
        let provisioner = provisioner(provider);
        let schema = schema(&[
            ("token", access_token()),
            ("droplet", input("droplet")),
            ("size", input("size")),
        ]);
        let inputs = InputValues::from([("token".to_string(), json!("t"))]);

        let credentials = provisioner.provision("ssh-rsa AAA", &schema, &inputs).await;

        assert_eq!(credentials[&ProviderKind::DigitalOcean], "4242");
        let uploads: Vec<_> = calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ProviderCall::UploadKey { .. }))
            .cloned()
            .collect();
        assert_eq!(
            uploads,
            vec![ProviderCall::UploadKey {
                name: "tofuhub".into(),
                token: "t".into()
            }]
        );
    }

    #[tokio::test]
    async fn missing_token_skips_provider() {
        let provider = FakeProvider::new();
        let calls = provider.calls();
        let provisioner = provisioner(provider);
        let schema = schema(&[("token", access_token())]);

        let credentials = provisioner
            .provision("ssh-rsa AAA", &schema, &InputValues::new())
            .await;

        assert!(credentials.is_empty());
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_is_not_fatal() {
        let provisioner = provisioner(FakeProvider::new().failing_uploads());
        let schema = schema(&[("token", access_token())]);
        let inputs = InputValues::from([("token".to_string(), json!("t"))]);

        let credentials = provisioner.provision("ssh-rsa AAA", &schema, &inputs).await;
        assert!(credentials.is_empty());
    }

    #[tokio::test]
    async fn unknown_provider_is_skipped() {
        let provider = FakeProvider::new().with_key_id("1");
        let provisioner = provisioner(provider);
        let mut schema = schema(&[("token", access_token())]);
        schema.insert(
            "aws_token".into(),
            InputDef {
                provider: Some("aws".into()),
                primitive: Some("access_token".into()),
                ..InputDef::default()
            },
        );
        let inputs = InputValues::from([
            ("token".to_string(), json!("t")),
            ("aws_token".to_string(), json!("a")),
        ]);

        let credentials = provisioner.provision("ssh-rsa AAA", &schema, &inputs).await;
        assert_eq!(credentials.len(), 1);
    }

    #[tokio::test]
    async fn reads_and_trims_public_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_rsa.pub");
        std::fs::write(&path, "ssh-rsa AAAA user@host\n").unwrap();

        assert_eq!(read_public_key(&path).await.unwrap(), "ssh-rsa AAAA user@host");
    }
}
