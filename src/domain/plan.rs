//! Declarative execution plans.
//!
//! An [`ExecutionPlan`] describes how to run one step's containerized
//! workload without committing to a backend. Adapters render it into
//! whatever their runtime needs (compose overrides, CLI flags, API calls).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

/// A `host:container` port binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    pub host: u16,
    pub container: u16,
}

impl FromStr for PortBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u16>()
                .map_err(|_| format!("invalid port '{part}' in '{s}'"))
        };
        match s.split_once(':') {
            Some((host, container)) => Ok(Self {
                host: parse(host)?,
                container: parse(container)?,
            }),
            None => {
                let port = parse(s)?;
                Ok(Self {
                    host: port,
                    container: port,
                })
            }
        }
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// A bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn read_only(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }

    pub fn read_write(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.display(), self.target)?;
        if self.read_only {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

/// Everything an execution backend needs to run one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    /// Step the plan belongs to.
    pub step: String,
    /// Service to run within the compose project.
    pub service: String,
    /// Local checkout the workload is built from.
    pub working_dir: PathBuf,
    /// Compose file inside `working_dir`.
    pub compose_file: String,
    /// Image tag for the step's build.
    pub image: String,
    /// Build the image before running.
    pub build: bool,
    #[serde(skip)]
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortBinding>,
    pub mounts: Vec<VolumeMount>,
}

impl ExecutionPlan {
    /// Environment variable names, without values.
    #[must_use]
    pub fn env_keys(&self) -> Vec<&str> {
        self.env.keys().map(String::as_str).collect()
    }
}
