//! Package catalog port.

use async_trait::async_trait;

use crate::domain::PackageDetails;
use crate::error::Result;

/// Read-only lookup of package metadata.
#[async_trait]
pub trait PackageCatalog: Send + Sync {
    /// Fetch a package's repository, kind and declared input schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`](crate::error::Error::Lookup) when the package
    /// cannot be fetched or its metadata cannot be parsed.
    async fn fetch(&self, package: &str) -> Result<PackageDetails>;
}
