use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::CollisionReport;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures while preparing a step's execution environment.
///
/// Every variant is fatal for the whole run, not just the step.
#[derive(Error, Debug)]
pub enum MaterializationError {
    #[error("failed to prepare {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("step {field} '{value}' is not a plain directory name")]
    InvalidName { field: &'static str, value: String },

    #[error("step '{step}' has no source repository")]
    MissingRepository { step: String },

    #[error("failed to clone {url}: {reason}")]
    Clone { url: String, reason: String },

    #[error("no {descriptor} found in {}", dir.display())]
    MissingDescriptor { descriptor: String, dir: PathBuf },

    #[error("failed to mirror repository '{name}': {reason}")]
    Mirror { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Catalog or provider fetch failure.
    #[error("lookup failed for '{target}': {reason}")]
    Lookup { target: String, reason: String },

    /// Two steps declare the same variable key.
    #[error("conflict detected: variable \"{key}\" is already defined in another step")]
    Conflict { key: String },

    /// Named resources already exist in the target account.
    #[error("resource collision: {0}")]
    Collision(CollisionReport),

    #[error("missing access token for provider '{provider}'")]
    MissingAccessToken { provider: String },

    #[error(transparent)]
    Materialization(#[from] MaterializationError),

    /// A step's subprocess exited non-zero.
    #[error("step '{step}' exited with code {code}")]
    Execution { step: String, code: i32 },

    #[error("a run is already in progress")]
    RunInProgress,

    #[error("run cancelled")]
    Cancelled,

    #[error("step '{step}' timed out after {}s", limit.as_secs())]
    Timeout { step: String, limit: Duration },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("process error: {0}")]
    Process(String),
}

impl Error {
    /// Whether this error aborted the run before any step was executed.
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::Collision(_) | Self::MissingAccessToken { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CollisionResult, CollisionResults};

    #[test]
    fn conflict_message_names_key() {
        let err = Error::Conflict {
            key: "db_name".into(),
        };
        assert!(err.to_string().contains("\"db_name\""));
    }

    #[test]
    fn collision_message_lists_every_key() {
        let mut results = CollisionResults::new();
        results.insert("a".into(), CollisionResult::exists("Resource already exists: x"));
        results.insert("b".into(), CollisionResult::exists("Resource already exists: y"));
        let report = CollisionReport::from_results(&results).unwrap();
        let message = Error::Collision(report).to_string();
        assert!(message.contains("a: Resource already exists: x"));
        assert!(message.contains("b: Resource already exists: y"));
    }

    #[test]
    fn preflight_classification() {
        assert!(Error::MissingAccessToken {
            provider: "digitalocean".into()
        }
        .is_preflight());
        assert!(!Error::Execution {
            step: "s".into(),
            code: 1
        }
        .is_preflight());
    }
}
