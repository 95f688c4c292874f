//! In-memory package catalog.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::PackageDetails;
use crate::error::{Error, Result};
use crate::port::PackageCatalog;

/// Serves fixed package details; unknown names fail like a 404.
#[derive(Default)]
pub struct StaticCatalog {
    packages: HashMap<String, PackageDetails>,
    failures: HashSet<String>,
    fetches: Arc<AtomicU32>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, name: &str, details: PackageDetails) -> Self {
        self.packages.insert(name.to_string(), details);
        self
    }

    /// Make fetching `name` fail even if it is registered.
    pub fn with_failure(mut self, name: &str) -> Self {
        self.failures.insert(name.to_string());
        self
    }

    /// Shared counter of fetch calls.
    pub fn fetches(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl PackageCatalog for StaticCatalog {
    async fn fetch(&self, package: &str) -> Result<PackageDetails> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failures.contains(package) {
            return Err(Error::Lookup {
                target: package.to_string(),
                reason: "HTTP 500: scripted failure".into(),
            });
        }
        self.packages
            .get(package)
            .cloned()
            .ok_or_else(|| Error::Lookup {
                target: package.to_string(),
                reason: "HTTP 404: not found".into(),
            })
    }
}
