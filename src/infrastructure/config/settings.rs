//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; every section is optional and
//! falls back to defaults. Tokens are never read from the file, see
//! [`Secrets`](super::Secrets).
//!
//! # Example
//!
//! ```no_run
//! use tofuhub::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("tofuhub.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use super::logging::LoggingConfig;
use crate::adapter::outbound::catalog::API_URL;
use crate::domain::PortBinding;
use crate::error::{ConfigError, Result};
use crate::infrastructure::paths::expand_tilde;

/// Package catalog endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Token used when neither `TOFUHUB_API_TOKEN` nor the token file is set.
    pub anonymous_token: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: API_URL.into(),
            anonymous_token: None,
        }
    }
}

/// Local directories and the layout expected inside package repositories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub staging_root: PathBuf,
    pub output_dir: PathBuf,
    pub build_descriptor: String,
    pub compose_file: String,
    pub service: String,
    /// Remove `staging_root` when the service starts.
    pub clean_on_start: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::from("tofuhub"),
            output_dir: PathBuf::from("tofuhub/output"),
            build_descriptor: "Dockerfile".into(),
            compose_file: "docker-compose.yml".into(),
            service: "tofuhub-worker".into(),
            clean_on_start: false,
        }
    }
}

/// Key material pushed to providers and mounted into step containers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub key_dir: PathBuf,
    pub public_key_file: String,
    pub private_key_file: String,
    /// Name the key is registered under at each provider.
    pub key_name: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("~/.ssh"),
            public_key_file: "id_rsa.pub".into(),
            private_key_file: "id_rsa".into(),
            key_name: "tofuhub".into(),
        }
    }
}

impl CredentialsConfig {
    /// `key_dir` with `~` expanded.
    #[must_use]
    pub fn key_dir(&self) -> PathBuf {
        expand_tilde(&self.key_dir)
    }

    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.key_dir().join(&self.public_key_file)
    }
}

/// Container execution settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// `host:container` bindings published for every step.
    pub ports: Vec<String>,
    pub mount_docker_socket: bool,
    pub docker_socket: PathBuf,
    /// Upper bound for one step, image build and container run together.
    pub timeout_secs: u64,
    pub build_image: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            ports: vec!["6080:6080".into()],
            mount_docker_socket: false,
            docker_socket: PathBuf::from("/var/run/docker.sock"),
            timeout_secs: 3600,
            build_image: false,
        }
    }
}

impl ExecutionConfig {
    /// Parsed port bindings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed binding.
    pub fn port_bindings(&self) -> std::result::Result<Vec<PortBinding>, ConfigError> {
        self.ports
            .iter()
            .map(|p| {
                p.parse::<PortBinding>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        field: "execution.ports",
                        reason,
                    })
            })
            .collect()
    }
}

/// Mirroring of deploy packages into the user's repository host account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub enabled: bool,
    /// Organization to create repositories in; the token's user otherwise.
    pub org: Option<String>,
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub workspace: WorkspaceConfig,
    pub credentials: CredentialsConfig,
    pub execution: ExecutionConfig,
    pub mirror: MirrorConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] when the file exists.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.catalog.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "catalog.base_url",
            }
            .into());
        }
        Url::parse(&self.catalog.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "catalog.base_url",
            reason: e.to_string(),
        })?;

        if self.workspace.build_descriptor.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "workspace.build_descriptor",
            }
            .into());
        }
        if self.workspace.compose_file.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "workspace.compose_file",
            }
            .into());
        }
        if self.workspace.service.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "workspace.service",
            }
            .into());
        }

        self.execution.port_bindings()?;
        if self.execution.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "execution.timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
