//! Handlers for the `run`, `check` and `state` commands.

use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};

use super::command::{SessionArgs, StateArgs};
use super::output;
use crate::application::DeploymentService;
use crate::domain::{CollisionReport, CollisionResult, DeploymentSession, InputValues};
use crate::error::{Error, Result};

/// Read user inputs from a JSON object file. No file means no inputs.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON object.
pub async fn read_inputs(path: Option<&Path>) -> Result<InputValues> {
    let Some(path) = path else {
        return Ok(InputValues::new());
    };
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Deploy every package, relaying container output to stdout.
///
/// # Errors
///
/// Returns the first error that ended the run.
pub async fn execute_run(service: Arc<DeploymentService>, args: &SessionArgs) -> Result<()> {
    let inputs = read_inputs(args.inputs.as_deref()).await?;
    let session = service.init_session(&args.packages).await?;
    print_session(&session);
    service.set_inputs(inputs)?;

    let mut observer = service.broadcaster().attach();
    let observer_id = observer.id();
    let printer = tokio::spawn(async move {
        while let Some(chunk) = observer.recv().await {
            output::stream(&chunk);
        }
    });

    let interrupt = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling run");
                service.cancel();
            }
        })
    };

    let result = service.run().await;
    interrupt.abort();
    service.broadcaster().detach(observer_id);
    printer.await.ok();

    let report = result?;
    if output::is_json() {
        output::json_value("report", &report);
        return Ok(());
    }
    output::section("Run");
    output::field("Run", report.id);
    output::field("Executed", report.executed.join(", "));
    if !report.skipped.is_empty() {
        output::warning(&format!("skipped malformed steps: {}", report.skipped.join(", ")));
    }
    output::success(&format!("{} step(s) deployed", report.executed.len()));
    info!(run = %report.id, "run finished");
    Ok(())
}

/// Check the inputs for name collisions.
///
/// # Errors
///
/// Returns [`Error::Collision`] if any resource already exists, or the
/// error that prevented the check.
pub async fn execute_check(service: Arc<DeploymentService>, args: &SessionArgs) -> Result<()> {
    let inputs = read_inputs(args.inputs.as_deref()).await?;
    service.init_session(&args.packages).await?;
    let results = service.check_collisions(&inputs).await?;

    if output::is_json() {
        output::json_value("collisions", &results);
    } else {
        output::section("Collisions");
        for (key, result) in &results {
            match result {
                CollisionResult::Clear => output::field(key, "clear"),
                CollisionResult::Exists { message } => output::warning(&format!("{key}: {message}")),
                CollisionResult::Failed { message } => {
                    output::warning(&format!("{key}: check failed: {message}"));
                }
            }
        }
    }

    match CollisionReport::from_results(&results) {
        Some(report) => Err(Error::Collision(report)),
        None => {
            output::success("no collisions");
            Ok(())
        }
    }
}

/// Show the session built from the packages.
///
/// # Errors
///
/// Returns the catalog or merge error from building the session.
pub async fn execute_state(service: Arc<DeploymentService>, args: &StateArgs) -> Result<()> {
    let session = service.init_session(&args.packages).await?;
    if output::is_json() {
        output::json_value("state", &session);
        return Ok(());
    }
    print_session(&session);
    output::section("Variables");
    for (key, def) in &session.variables {
        let mut notes = Vec::new();
        if def.required {
            notes.push("required".to_owned());
        }
        if def.secret {
            notes.push("secret".to_owned());
        }
        if let Some(primitive) = &def.primitive {
            notes.push(primitive.clone());
        }
        output::field(key, notes.join(", "));
    }
    Ok(())
}

fn print_session(session: &DeploymentSession) {
    if output::is_json() {
        return;
    }
    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Steps");
    for (index, step) in session.steps.iter().enumerate() {
        output::field(&format!("{}.", index + 1), format!("{} ({:?})", step.name, step.kind));
    }
}
