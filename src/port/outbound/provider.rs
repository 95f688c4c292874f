//! Cloud provider port.
//!
//! Each provider is a capability behind [`ProviderClient`]; new providers
//! are added by implementing the trait and registering the client, not by
//! editing a shared dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ProviderKind, ResourceKind};
use crate::error::Result;

/// Resource-existence and credential-upload capabilities of a provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether a resource of `kind` named `name` exists in the account.
    async fn exists(&self, kind: ResourceKind, name: &str, token: &str) -> Result<bool>;

    /// Register a public key and return the provider-assigned identifier.
    async fn upload_key(&self, name: &str, public_key: &str, token: &str) -> Result<String>;
}

/// Provider clients keyed by provider kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<ProviderKind, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its own kind, replacing any previous one.
    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        self.clients.insert(client.kind(), client);
    }

    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn ProviderClient>> {
        self.clients.get(&kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.clients.keys().collect();
        kinds.sort();
        f.debug_struct("ProviderRegistry").field("providers", &kinds).finish()
    }
}
