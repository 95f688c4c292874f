//! Session control surface.
//!
//! [`DeploymentService`] is what a transport (HTTP, WebSocket, CLI) talks
//! to. It owns the session store and the runner, and serializes runs: a run
//! request while another run is in flight is rejected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::broadcast::LogBroadcaster;
use super::runner::StepRunner;
use super::state::StateStore;
use crate::domain::{CollisionResults, DeploymentSession, InputValues, RunPhase, RunReport};
use crate::error::{Error, Result};

/// Clears the in-flight flag on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DeploymentService {
    store: StateStore,
    runner: StepRunner,
    broadcaster: Arc<LogBroadcaster>,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl DeploymentService {
    #[must_use]
    pub fn new(store: StateStore, runner: StepRunner, broadcaster: Arc<LogBroadcaster>) -> Self {
        Self {
            store,
            runner,
            broadcaster,
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.running.load(Ordering::Acquire) {
            return Err(Error::RunInProgress);
        }
        Ok(())
    }

    /// Replace the session with the given packages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunInProgress`] while a run is in flight, otherwise
    /// the error from [`StateStore::init`].
    pub async fn init_session(&self, packages: &[String]) -> Result<DeploymentSession> {
        self.ensure_idle()?;
        self.store.init(packages).await
    }

    /// Clear the session, inputs included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunInProgress`] while a run is in flight.
    pub fn reset_session(&self) -> Result<DeploymentSession> {
        self.ensure_idle()?;
        Ok(self.store.reset())
    }

    /// Replace the session inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunInProgress`] while a run is in flight.
    pub fn set_inputs(&self, values: InputValues) -> Result<DeploymentSession> {
        self.ensure_idle()?;
        Ok(self.store.set_inputs(values))
    }

    #[must_use]
    pub fn get_state(&self) -> DeploymentSession {
        self.store.snapshot()
    }

    /// Check `inputs` for collisions against the session's merged schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAccessToken`] when a check needs a token that
    /// was not supplied.
    pub async fn check_collisions(&self, inputs: &InputValues) -> Result<CollisionResults> {
        let variables = self.store.snapshot().variables;
        self.runner.collisions().check(&variables, inputs).await
    }

    /// Run every step of the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunInProgress`] if another run is in flight, otherwise
    /// the error from [`StepRunner::run`].
    pub async fn run(&self) -> Result<RunReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::RunInProgress);
        }
        let _guard = RunGuard(&self.running);

        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        self.runner.run(&self.store, token).await
    }

    /// Cancel the run in flight, if any.
    pub fn cancel(&self) {
        if self.running.load(Ordering::Acquire) {
            info!("cancelling run");
            self.cancel.lock().cancel();
        }
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.runner.phase()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn broadcaster(&self) -> &Arc<LogBroadcaster> {
        &self.broadcaster
    }
}
