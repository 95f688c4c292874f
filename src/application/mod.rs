//! Application layer: the orchestration pipeline.
//!
//! - [`state`] - Session store with explicit init/reset lifecycle
//! - [`collision`] - Pre-flight name-collision gate
//! - [`credentials`] - Best-effort public key upload per provider
//! - [`materializer`] - Source staging and execution plan construction
//! - [`runner`] - Sequential step runner
//! - [`broadcast`] - Subprocess output fan-out
//! - [`service`] - Session control surface consumed by transports

pub mod broadcast;
pub mod collision;
pub mod credentials;
pub mod materializer;
pub mod runner;
pub mod service;
pub mod state;

pub use broadcast::{LogBroadcaster, Observer, ObserverId};
pub use collision::CollisionChecker;
pub use credentials::CredentialProvisioner;
pub use materializer::{ExecutionMaterializer, MaterializerSettings};
pub use runner::StepRunner;
pub use service::DeploymentService;
pub use state::StateStore;
