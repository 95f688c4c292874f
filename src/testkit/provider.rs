//! Recording provider client.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ProviderKind, ResourceKind};
use crate::error::{Error, Result};
use crate::port::ProviderClient;

/// A call observed by [`FakeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Exists {
        kind: ResourceKind,
        name: String,
        token: String,
    },
    UploadKey {
        name: String,
        token: String,
    },
}

/// A DigitalOcean stand-in with scripted resources and failures.
pub struct FakeProvider {
    existing: HashSet<(ResourceKind, String)>,
    failing: HashSet<ResourceKind>,
    key_id: String,
    fail_uploads: bool,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            existing: HashSet::new(),
            failing: HashSet::new(),
            key_id: "1".into(),
            fail_uploads: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(mut self, kind: ResourceKind, name: &str) -> Self {
        self.existing.insert((kind, name.to_string()));
        self
    }

    /// Existence checks for `kind` return an error.
    pub fn failing_on(mut self, kind: ResourceKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn with_key_id(mut self, id: &str) -> Self {
        self.key_id = id.to_string();
        self
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    /// Shared log of every call, in order.
    pub fn calls(&self) -> Arc<Mutex<Vec<ProviderCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DigitalOcean
    }

    async fn exists(&self, kind: ResourceKind, name: &str, token: &str) -> Result<bool> {
        self.calls.lock().push(ProviderCall::Exists {
            kind,
            name: name.to_string(),
            token: token.to_string(),
        });
        if self.failing.contains(&kind) {
            return Err(Error::Connection("DigitalOcean API error: 500".into()));
        }
        Ok(self.existing.contains(&(kind, name.to_string())))
    }

    async fn upload_key(&self, name: &str, _public_key: &str, token: &str) -> Result<String> {
        self.calls.lock().push(ProviderCall::UploadKey {
            name: name.to_string(),
            token: token.to_string(),
        });
        if self.fail_uploads {
            return Err(Error::Connection("DigitalOcean rejected ssh key (401)".into()));
        }
        Ok(self.key_id.clone())
    }
}
