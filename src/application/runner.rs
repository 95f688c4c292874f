//! Sequential step runner.
//!
//! A run passes the collision gate once, then processes the session's steps
//! strictly in order: provision credentials, materialize the execution
//! environment, launch the subprocess and wait for it. A malformed step is
//! skipped; any other step failure ends the run. Already-applied
//! infrastructure from completed steps is not rolled back.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::broadcast::LogBroadcaster;
use super::collision::CollisionChecker;
use super::credentials::{read_public_key, CredentialProvisioner};
use super::materializer::ExecutionMaterializer;
use super::state::StateStore;
use crate::domain::{CredentialMap, DeploymentSession, RunPhase, RunReport, Step};
use crate::error::{Error, MaterializationError, Result};
use crate::port::{ExecutionBackend, LogSink};

pub struct StepRunner {
    collisions: CollisionChecker,
    credentials: CredentialProvisioner,
    materializer: ExecutionMaterializer,
    backend: Arc<dyn ExecutionBackend>,
    broadcaster: Arc<LogBroadcaster>,
    public_key_path: PathBuf,
    phase: RwLock<RunPhase>,
}

impl StepRunner {
    #[must_use]
    pub fn new(
        collisions: CollisionChecker,
        credentials: CredentialProvisioner,
        materializer: ExecutionMaterializer,
        backend: Arc<dyn ExecutionBackend>,
        broadcaster: Arc<LogBroadcaster>,
        public_key_path: PathBuf,
    ) -> Self {
        Self {
            collisions,
            credentials,
            materializer,
            backend,
            broadcaster,
            public_key_path,
            phase: RwLock::new(RunPhase::Idle),
        }
    }

    /// Phase of the current or most recent run.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        *self.phase.read()
    }

    #[must_use]
    pub fn collisions(&self) -> &CollisionChecker {
        &self.collisions
    }

    fn set_phase(&self, phase: RunPhase) {
        *self.phase.write() = phase;
        debug!(?phase, "run phase changed");
    }

    /// Execute every step of the current session.
    ///
    /// # Errors
    ///
    /// - [`Error::Collision`] or [`Error::MissingAccessToken`] from the
    ///   collision gate; no step is executed.
    /// - [`Error::Materialization`] when a step's environment cannot be built.
    /// - [`Error::Execution`] when a step's subprocess exits non-zero.
    /// - [`Error::Cancelled`] or [`Error::Timeout`] from the backend.
    pub async fn run(&self, store: &StateStore, cancel: CancellationToken) -> Result<RunReport> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run = %id, "run started");

        self.set_phase(RunPhase::CollisionGate);
        let session = store.snapshot();
        if let Err(e) = self.collisions.gate(&session.variables, &session.inputs).await {
            self.set_phase(RunPhase::Aborted);
            self.broadcaster.broadcast(&format!("[run aborted: {e}]\n"));
            return Err(e);
        }

        self.set_phase(RunPhase::Running);
        let public_key = self.load_public_key().await;
        let mut executed = Vec::new();
        let mut skipped = Vec::new();

        for step in &session.steps {
            if let Some(field) = step.missing_field() {
                warn!(run = %id, field, "step is missing a required field, skipping");
                skipped.push(step_label(step));
                continue;
            }

            if cancel.is_cancelled() {
                self.set_phase(RunPhase::Failed);
                return Err(Error::Cancelled);
            }

            if let Err(e) = self
                .run_step(step, &session, public_key.as_deref(), cancel.clone())
                .await
            {
                error!(run = %id, step = %step.name, error = %e, "step failed, stopping run");
                self.set_phase(RunPhase::Failed);
                return Err(e);
            }
            executed.push(step.name.clone());
        }

        self.set_phase(RunPhase::Completed);
        info!(run = %id, executed = executed.len(), skipped = skipped.len(), "run completed");
        Ok(RunReport {
            id,
            phase: RunPhase::Completed,
            started_at,
            finished_at: Utc::now(),
            executed,
            skipped,
            session: store.snapshot(),
        })
    }

    async fn run_step(
        &self,
        step: &Step,
        session: &DeploymentSession,
        public_key: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!(step = %step.name, package = %step.package, "processing step");
        let inputs = &session.inputs;

        // Providers referenced by any step are provisioned, so a step can use
        // a token declared by another one.
        let credentials = match public_key {
            Some(key) => {
                self.credentials
                    .provision(key, &session.variables, inputs)
                    .await
            }
            None => CredentialMap::new(),
        };

        let repository = step
            .repository
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| MaterializationError::MissingRepository {
                step: step.name.clone(),
            })?;
        let plan = self
            .materializer
            .materialize(step, repository, inputs, &credentials)
            .await?;

        info!(step = %step.name, backend = self.backend.name(), "launching step");
        let output: Arc<dyn LogSink> = self.broadcaster.clone();
        let code = self.backend.execute(&plan, output, cancel).await?;
        self.broadcaster
            .broadcast(&format!("[container exited with code {code}]\n"));

        if code != 0 {
            return Err(Error::Execution {
                step: step.name.clone(),
                code,
            });
        }

        info!(step = %step.name, "step completed");
        Ok(())
    }

    async fn load_public_key(&self) -> Option<String> {
        match read_public_key(&self.public_key_path).await {
            Ok(key) if !key.is_empty() => Some(key),
            Ok(_) => {
                warn!(path = %self.public_key_path.display(), "public key is empty, skipping credential provisioning");
                None
            }
            Err(e) => {
                warn!(
                    path = %self.public_key_path.display(),
                    error = %e,
                    "public key unavailable, skipping credential provisioning"
                );
                None
            }
        }
    }
}

fn step_label(step: &Step) -> String {
    if step.name.trim().is_empty() {
        step.package.clone()
    } else {
        step.name.clone()
    }
}
