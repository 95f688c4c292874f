//! Tokens resolved from the environment and the per-user token files.
//!
//! Secrets never come from the TOML file.

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::infrastructure::paths::{self, GITHUB_TOKEN_FILE, TOKEN_FILE};

pub const CATALOG_TOKEN_ENV: &str = "TOFUHUB_API_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Clone, Default)]
pub struct Secrets {
    /// Bearer token for the package catalog. Empty means unauthenticated.
    pub catalog_token: String,
    /// Token for the repository host; mirroring is skipped without it.
    pub github_token: Option<String>,
}

impl Secrets {
    /// Resolve secrets from the process environment and `~/.tofuhub`.
    #[must_use]
    pub fn from_env(anonymous_token: Option<&str>) -> Self {
        Self::resolve(
            std::env::var(CATALOG_TOKEN_ENV).ok(),
            std::env::var(GITHUB_TOKEN_ENV).ok(),
            paths::state_dir().as_deref(),
            anonymous_token,
        )
    }

    /// Environment values win over token files; the catalog token finally
    /// falls back to `anonymous_token`.
    #[must_use]
    pub fn resolve(
        catalog_env: Option<String>,
        github_env: Option<String>,
        state_dir: Option<&Path>,
        anonymous_token: Option<&str>,
    ) -> Self {
        let catalog_token = non_empty(catalog_env)
            .or_else(|| state_dir.and_then(|dir| read_token(&dir.join(TOKEN_FILE), "token")))
            .or_else(|| anonymous_token.map(ToOwned::to_owned))
            .unwrap_or_default();

        let github_token = non_empty(github_env).or_else(|| {
            state_dir.and_then(|dir| read_token(&dir.join(GITHUB_TOKEN_FILE), "access_token"))
        });

        Self {
            catalog_token,
            github_token,
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("catalog_token", &(!self.catalog_token.is_empty()))
            .field("github_token", &self.github_token.is_some())
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Read a string `field` from a JSON token file. Unreadable or malformed
/// files count as absent.
fn read_token(path: &Path, field: &str) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let parsed: Value = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring malformed token file");
            return None;
        }
    };
    non_empty(parsed.get(field)?.as_str().map(ToOwned::to_owned))
}
