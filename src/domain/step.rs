//! Deployment steps and the catalog metadata they are built from.

use serde::{Deserialize, Serialize};

use super::input::InputSchema;

/// Kind of package a step deploys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepKind {
    /// Deploy package; its source is mirrored to the user's repository host.
    #[default]
    Package,
    Agent,
}

/// Package metadata returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDetails {
    pub name: String,
    pub kind: StepKind,
    pub repository: Option<String>,
    pub inputs: InputSchema,
}

/// One package to be deployed within a session.
///
/// Immutable once the session is initialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub package: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(rename = "variables")]
    pub input_schema: InputSchema,
}

impl Step {
    /// Build a step from the package reference and its catalog details.
    #[must_use]
    pub fn from_package(package: impl Into<String>, details: PackageDetails) -> Self {
        Self {
            name: details.name,
            package: package.into(),
            kind: details.kind,
            repository: details.repository,
            input_schema: details.inputs,
        }
    }

    /// Name of the first required field that is missing, if any.
    ///
    /// Malformed steps are skipped by the runner rather than failing the run.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.package.trim().is_empty() {
            Some("package")
        } else if self.name.trim().is_empty() {
            Some("name")
        } else {
            None
        }
    }
}
