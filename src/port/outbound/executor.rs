//! Execution backend port.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::log::LogSink;
use crate::domain::ExecutionPlan;
use crate::error::Result;

/// Runs an [`ExecutionPlan`] as a subprocess.
///
/// Both output streams are forwarded to `output` as chunks arrive, without
/// buffering the whole output.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Execute the plan and return the subprocess exit code.
    ///
    /// # Errors
    ///
    /// Returns an error when the subprocess cannot be started, when
    /// `cancel` fires ([`Error::Cancelled`](crate::error::Error::Cancelled)),
    /// or when the backend's time limit elapses
    /// ([`Error::Timeout`](crate::error::Error::Timeout)). A non-zero exit is
    /// not an error at this layer.
    async fn execute(
        &self,
        plan: &ExecutionPlan,
        output: Arc<dyn LogSink>,
        cancel: CancellationToken,
    ) -> Result<i32>;
}
