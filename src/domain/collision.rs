//! Collision check results.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Outcome of an existence check for one input key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionResult {
    /// No resource with that name, or the key is not collision-checked.
    Clear,
    /// A resource with that name already exists.
    Exists { message: String },
    /// The check itself failed.
    Failed { message: String },
}

impl CollisionResult {
    pub fn exists(message: impl Into<String>) -> Self {
        Self::Exists {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Exists { .. })
    }
}

impl Serialize for CollisionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Clear => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("exists", &false)?;
                map.end()
            }
            Self::Exists { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("exists", &true)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
            Self::Failed { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", &true)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

/// Per-key collision results for one run.
pub type CollisionResults = BTreeMap<String, CollisionResult>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    pub key: String,
    pub message: String,
}

/// Aggregated list of conflicting keys that aborts a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionReport {
    conflicts: Vec<ConflictEntry>,
}

impl CollisionReport {
    /// Collect every colliding key; `None` when nothing collides.
    #[must_use]
    pub fn from_results(results: &CollisionResults) -> Option<Self> {
        let conflicts: Vec<_> = results
            .iter()
            .filter_map(|(key, result)| match result {
                CollisionResult::Exists { message } => Some(ConflictEntry {
                    key: key.clone(),
                    message: message.clone(),
                }),
                _ => None,
            })
            .collect();

        (!conflicts.is_empty()).then_some(Self { conflicts })
    }

    #[must_use]
    pub fn conflicts(&self) -> &[ConflictEntry] {
        &self.conflicts
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.conflicts.iter().map(|c| c.key.as_str()).collect()
    }
}

impl fmt::Display for CollisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self
            .conflicts
            .iter()
            .map(|c| format!("{}: {}", c.key, c.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}
