//! Repository host port.

use async_trait::async_trait;

use crate::error::Result;

/// A repository created on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRepository {
    pub name: String,
    pub clone_url: String,
    pub html_url: String,
}

/// VCS host used to mirror deploy packages into the user's account.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Whether a repository with `name` already exists in the target account.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Create a private repository.
    async fn create(&self, name: &str) -> Result<CreatedRepository>;

    /// Clone URL carrying the host credentials, suitable for `git push`.
    fn authenticated_url(&self, clone_url: &str) -> String;
}
