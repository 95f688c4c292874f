//! Rendering of an [`ExecutionPlan`] into compose invocations.

use serde_json::{json, Map, Value};

use crate::domain::ExecutionPlan;

/// Override file written next to the package's compose file for the
/// duration of a step.
pub const OVERRIDE_FILE: &str = "docker-compose.tofuhub.json";

/// Compose override pinning the image tag and adding the plan's mounts.
///
/// Compose accepts JSON wherever it accepts YAML.
pub fn override_document(plan: &ExecutionPlan) -> Value {
    let volumes: Vec<String> = plan.mounts.iter().map(ToString::to_string).collect();
    let mut service = Map::new();
    service.insert("image".into(), json!(plan.image));
    if !volumes.is_empty() {
        service.insert("volumes".into(), json!(volumes));
    }
    let mut services = Map::new();
    services.insert(plan.service.clone(), Value::Object(service));
    json!({ "services": services })
}

fn files(plan: &ExecutionPlan) -> Vec<String> {
    vec![
        "compose".into(),
        "-f".into(),
        plan.compose_file.clone(),
        "-f".into(),
        OVERRIDE_FILE.into(),
    ]
}

/// `compose ... build <service>`.
pub fn build_args(plan: &ExecutionPlan) -> Vec<String> {
    let mut args = files(plan);
    args.push("build".into());
    args.push(plan.service.clone());
    args
}

/// `compose ... run --rm -e K ... -p H:C ... <service>`.
///
/// Only variable names go on the command line; values travel through the
/// child's environment so secrets never appear in process listings.
pub fn run_args(plan: &ExecutionPlan) -> Vec<String> {
    let mut args = files(plan);
    args.push("run".into());
    args.push("--rm".into());
    for key in plan.env.keys() {
        args.push("-e".into());
        args.push(key.clone());
    }
    for port in &plan.ports {
        args.push("-p".into());
        args.push(port.to_string());
    }
    args.push(plan.service.clone());
    args
}
