//! Run lifecycle types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::session::DeploymentSession;

/// Phase of the current (or last) run.
///
/// `Idle -> CollisionGate -> (Aborted | Running) -> (Completed | Failed)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    CollisionGate,
    Aborted,
    Running,
    Completed,
    Failed,
}

impl RunPhase {
    /// Whether a run is currently in flight.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::CollisionGate | Self::Running)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: Uuid,
    pub phase: RunPhase,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Steps whose subprocess exited successfully, in order.
    pub executed: Vec<String>,
    /// Steps skipped as malformed.
    pub skipped: Vec<String>,
    /// Final session snapshot.
    pub session: DeploymentSession,
}
