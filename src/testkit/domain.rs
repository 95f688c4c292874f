//! Builders for domain primitives used across tests.

use crate::domain::{InputDef, InputSchema, PackageDetails, StepKind, ACCESS_TOKEN};

/// A DigitalOcean input tagged with `primitive`.
pub fn input(primitive: &str) -> InputDef {
    InputDef {
        provider: Some("digitalocean".into()),
        primitive: Some(primitive.into()),
        ..InputDef::default()
    }
}

/// The DigitalOcean access token input.
pub fn access_token() -> InputDef {
    InputDef {
        secret: true,
        required: true,
        ..input(ACCESS_TOKEN)
    }
}

pub fn schema(entries: &[(&str, InputDef)]) -> InputSchema {
    entries
        .iter()
        .map(|(key, def)| ((*key).to_string(), def.clone()))
        .collect()
}

/// A `PACKAGE` with a repository URL derived from its name.
pub fn package(name: &str, inputs: &[(&str, InputDef)]) -> PackageDetails {
    PackageDetails {
        name: name.to_string(),
        kind: StepKind::Package,
        repository: Some(format!("https://git.example/{name}.git")),
        inputs: schema(inputs),
    }
}

/// An `AGENT` package, which is never mirrored.
pub fn agent(name: &str, inputs: &[(&str, InputDef)]) -> PackageDetails {
    PackageDetails {
        kind: StepKind::Agent,
        ..package(name, inputs)
    }
}
