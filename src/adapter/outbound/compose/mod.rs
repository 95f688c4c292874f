//! Docker Compose execution backend.
//!
//! A step runs as `docker compose run` against the package's own compose
//! file plus a generated override. Both output streams are pumped into the
//! log sink chunk by chunk while the process runs.

mod render;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use self::render::OVERRIDE_FILE;
use self::render::{build_args, override_document, run_args};
use crate::domain::ExecutionPlan;
use crate::error::{Error, Result};
use crate::port::{ExecutionBackend, LogSink};

const READ_CHUNK: usize = 8192;

pub struct ComposeBackend {
    program: String,
    /// Limit for a whole step, image build included.
    timeout: Duration,
}

impl ComposeBackend {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "docker".into(),
            timeout,
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn write_override(&self, plan: &ExecutionPlan) -> Result<()> {
        let path = plan.working_dir.join(OVERRIDE_FILE);
        let body = serde_json::to_vec_pretty(&override_document(plan))?;
        tokio::fs::write(&path, body).await?;
        debug!(path = %path.display(), "compose override written");
        Ok(())
    }

    async fn remove_override(&self, plan: &ExecutionPlan) {
        let path = plan.working_dir.join(OVERRIDE_FILE);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(path = %path.display(), error = %e, "compose override not removed");
        }
    }

    /// Spawn the program with `args` and stream its output until it exits
    /// or `deadline` passes.
    async fn stream(
        &self,
        plan: &ExecutionPlan,
        args: &[String],
        output: &Arc<dyn LogSink>,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<i32> {
        let mut child = Command::new(&self.program)
            .args(args)
            .envs(&plan.env)
            .current_dir(&plan.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Process(format!("failed to spawn {}: {e}", self.program)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(pump(stdout, Arc::clone(output)));
        let stderr_task = tokio::spawn(pump(stderr, Arc::clone(output)));

        let status = tokio::select! {
            () = cancel.cancelled() => {
                warn!(step = %plan.step, "step cancelled, killing subprocess");
                child.kill().await.ok();
                return Err(Error::Cancelled);
            }
            result = timeout_at(deadline, child.wait()) => {
                match result {
                    Ok(Ok(status)) => status,
                    Ok(Err(e)) => return Err(Error::Process(format!("wait failed: {e}"))),
                    Err(_) => {
                        warn!(step = %plan.step, limit_secs = self.timeout.as_secs(), "step timed out");
                        child.kill().await.ok();
                        return Err(Error::Timeout {
                            step: plan.step.clone(),
                            limit: self.timeout,
                        });
                    }
                }
            }
        };

        // Drain whatever is still buffered in the pipes.
        stdout_task.await.ok();
        stderr_task.await.ok();

        Ok(status.code().unwrap_or(-1))
    }
}

#[async_trait]
impl ExecutionBackend for ComposeBackend {
    fn name(&self) -> &'static str {
        "docker-compose"
    }

    #[instrument(skip(self, plan, output, cancel), fields(step = %plan.step))]
    async fn execute(
        &self,
        plan: &ExecutionPlan,
        output: Arc<dyn LogSink>,
        cancel: CancellationToken,
    ) -> Result<i32> {
        self.write_override(plan).await?;
        let deadline = Instant::now() + self.timeout;

        let result = async {
            if plan.build {
                info!(image = %plan.image, "building step image");
                let code = self
                    .stream(plan, &build_args(plan), &output, &cancel, deadline)
                    .await?;
                if code != 0 {
                    return Ok(code);
                }
            }
            info!(service = %plan.service, ports = plan.ports.len(), "starting container");
            self.stream(plan, &run_args(plan), &output, &cancel, deadline)
                .await
        }
        .await;

        self.remove_override(plan).await;
        result
    }
}

/// Forward a pipe to `sink` as text chunks.
async fn pump<R>(reader: Option<R>, sink: Arc<dyn LogSink>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut decoder = Utf8Chunks::default();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.push(&buf[..n]);
                if !text.is_empty() {
                    sink.emit(&text);
                }
            }
            Err(e) => {
                debug!(error = %e, "output pipe closed");
                break;
            }
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        sink.emit(&rest);
    }
}

/// Decodes a byte stream into text without splitting multi-byte characters
/// across chunks. Invalid sequences are replaced.
#[derive(Default)]
struct Utf8Chunks {
    pending: Vec<u8>,
}

impl Utf8Chunks {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let cut = match std::str::from_utf8(&self.pending) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => self.pending.len(),
        };
        let tail = self.pending.split_off(cut);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}
