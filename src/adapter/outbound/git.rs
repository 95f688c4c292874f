//! `git` command-line source control.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::port::SourceControl;

/// Drives the `git` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".into(),
        }
    }
}

impl GitCli {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git with `args`; `label` replaces the arguments in error messages
    /// so credentials embedded in URLs are never echoed.
    async fn git(&self, dir: Option<&Path>, args: &[&str], label: &str) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| Error::Process(format!("failed to spawn git {label}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Process(format!(
                "git {label} failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        debug!(url, dest = %dest_str, "git clone");
        self.git(None, &["clone", "--quiet", url, &dest_str], "clone")
            .await
    }

    async fn push(&self, repo_dir: &Path, remote_url: &str, branch: &str) -> Result<()> {
        self.git(
            Some(repo_dir),
            &["remote", "set-url", "origin", remote_url],
            "remote set-url",
        )
        .await?;
        let refspec = format!("HEAD:refs/heads/{branch}");
        debug!(dir = %repo_dir.display(), branch, "git push");
        self.git(Some(repo_dir), &["push", "--quiet", "origin", &refspec], "push")
            .await
    }
}
