//! Scripted execution backend and a recording log sink.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::domain::ExecutionPlan;
use crate::error::{Error, Result};
use crate::port::{ExecutionBackend, LogSink};

/// Emits scripted output for each step and exits with a scripted code
/// (0 unless configured).
#[derive(Default)]
pub struct ScriptedBackend {
    exit_codes: HashMap<String, i32>,
    output: HashMap<String, Vec<String>>,
    hang: HashMap<String, Duration>,
    plans: Arc<Mutex<Vec<ExecutionPlan>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(mut self, step: &str, code: i32) -> Self {
        self.exit_codes.insert(step.to_string(), code);
        self
    }

    pub fn with_output(mut self, step: &str, chunks: &[&str]) -> Self {
        self.output.insert(
            step.to_string(),
            chunks.iter().map(|c| (*c).to_string()).collect(),
        );
        self
    }

    /// Keep the step running for `duration` unless cancelled first.
    pub fn hanging(mut self, step: &str, duration: Duration) -> Self {
        self.hang.insert(step.to_string(), duration);
        self
    }

    /// Every plan executed, in order.
    pub fn plans(&self) -> Arc<Mutex<Vec<ExecutionPlan>>> {
        Arc::clone(&self.plans)
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        output: Arc<dyn LogSink>,
        cancel: CancellationToken,
    ) -> Result<i32> {
        self.plans.lock().push(plan.clone());

        for chunk in self.output.get(&plan.step).into_iter().flatten() {
            output.emit(chunk);
        }

        if let Some(duration) = self.hang.get(&plan.step) {
            tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(*duration) => {}
            }
        }

        Ok(self.exit_codes.get(&plan.step).copied().unwrap_or(0))
    }
}

/// Collects every emitted chunk.
#[derive(Default)]
pub struct RecordingSink {
    chunks: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<String> {
        self.chunks.lock().clone()
    }

    /// All chunks joined.
    pub fn text(&self) -> String {
        self.chunks.lock().concat()
    }
}

impl LogSink for RecordingSink {
    fn emit(&self, chunk: &str) {
        self.chunks.lock().push(chunk.to_string());
    }
}
