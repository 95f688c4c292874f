//! Deployment session payload.

use serde::Serialize;

use super::input::{InputSchema, InputValues};
use super::step::Step;
use crate::error::{Error, Result};

/// Current deployment session: steps, merged variables and user inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentSession {
    pub steps: Vec<Step>,
    pub variables: InputSchema,
    pub inputs: InputValues,
}

impl DeploymentSession {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.variables.is_empty() && self.inputs.is_empty()
    }
}

/// Merge the input schemas of all steps into one variable map.
///
/// A key may be declared by exactly one step; a redeclaration fails with
/// [`Error::Conflict`] naming the key.
pub fn merge_schemas(steps: &[Step]) -> Result<InputSchema> {
    let mut variables = InputSchema::new();
    for step in steps {
        for (key, def) in &step.input_schema {
            if variables.contains_key(key) {
                return Err(Error::Conflict { key: key.clone() });
            }
            variables.insert(key.clone(), def.clone());
        }
    }
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InputDef;

    fn step(name: &str, keys: &[&str]) -> Step {
        Step {
            name: name.into(),
            package: name.into(),
            input_schema: keys
                .iter()
                .map(|k| ((*k).to_string(), InputDef::default()))
                .collect(),
            ..Step::default()
        }
    }

    #[test]
    fn merges_disjoint_schemas() {
        let merged = merge_schemas(&[step("a", &["x", "y"]), step("b", &["z"])]).unwrap();
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn duplicate_key_is_a_conflict() {
        let err = merge_schemas(&[step("a", &["db_name"]), step("b", &["db_name"])]).unwrap_err();
        assert!(matches!(err, Error::Conflict { key } if key == "db_name"));
    }

    #[test]
    fn empty_session() {
        assert!(DeploymentSession::default().is_empty());
    }
}
