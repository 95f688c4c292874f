//! Filesystem-backed fakes for source control and the repository host.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::port::{CreatedRepository, RepositoryHost, SourceControl};

/// "Clones" by creating the destination directory with a build descriptor
/// and a compose file.
pub struct FakeSourceControl {
    with_descriptor: bool,
    failing: HashSet<String>,
    clones: Arc<Mutex<Vec<String>>>,
    pushes: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for FakeSourceControl {
    fn default() -> Self {
        Self {
            with_descriptor: true,
            failing: HashSet::new(),
            clones: Arc::new(Mutex::new(Vec::new())),
            pushes: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeSourceControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkouts lack a `Dockerfile`.
    pub fn without_descriptor(mut self) -> Self {
        self.with_descriptor = false;
        self
    }

    pub fn failing_clone(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Cloned URLs, in order.
    pub fn clones(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.clones)
    }

    /// `(remote_url, branch)` of every push.
    pub fn pushes(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.pushes)
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        if self.failing.contains(url) {
            return Err(Error::Process(format!(
                "git clone failed: repository '{url}' not found"
            )));
        }
        tokio::fs::create_dir_all(dest).await?;
        tokio::fs::write(dest.join("docker-compose.yml"), "services: {}\n").await?;
        if self.with_descriptor {
            tokio::fs::write(dest.join("Dockerfile"), "FROM scratch\n").await?;
        }
        self.clones.lock().push(url.to_string());
        Ok(())
    }

    async fn push(&self, _repo_dir: &Path, remote_url: &str, branch: &str) -> Result<()> {
        self.pushes
            .lock()
            .push((remote_url.to_string(), branch.to_string()));
        Ok(())
    }
}

/// Repository host with a fixed set of taken names.
#[derive(Default)]
pub struct FakeRepositoryHost {
    existing: HashSet<String>,
    created: Arc<Mutex<Vec<String>>>,
}

impl FakeRepositoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(mut self, name: &str) -> Self {
        self.existing.insert(name.to_string());
        self
    }

    /// Names of created repositories, in order.
    pub fn created(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.created)
    }
}

#[async_trait]
impl RepositoryHost for FakeRepositoryHost {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.existing.contains(name) || self.created.lock().iter().any(|n| n == name))
    }

    async fn create(&self, name: &str) -> Result<CreatedRepository> {
        self.created.lock().push(name.to_string());
        Ok(CreatedRepository {
            name: name.to_string(),
            clone_url: format!("https://git.example/me/{name}.git"),
            html_url: format!("https://git.example/me/{name}"),
        })
    }

    fn authenticated_url(&self, clone_url: &str) -> String {
        clone_url.replacen("https://", "https://token@", 1)
    }
}
