//! Source control port.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Local version-control operations on package sources.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Clone `url` into `dest`.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Point `origin` of the checkout at `remote_url` and push `branch`.
    async fn push(&self, repo_dir: &Path, remote_url: &str, branch: &str) -> Result<()>;
}
