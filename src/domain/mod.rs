//! Provider-agnostic deployment domain.
//!
//! Pure data types shared by the application layer and the adapters:
//! package steps and their input schemas, the deployment session, collision
//! results, credential maps and declarative execution plans.

mod collision;
mod input;
mod plan;
mod provider;
mod run;
mod session;
mod step;

pub use collision::{CollisionReport, CollisionResult, CollisionResults, ConflictEntry};
pub use input::{
    access_token_for, render_value, InputDef, InputKind, InputSchema, InputValues, ACCESS_TOKEN,
};
pub use plan::{ExecutionPlan, PortBinding, VolumeMount};
pub use provider::{CredentialMap, ProviderKind, ResourceKind};
pub use run::{RunPhase, RunReport};
pub use session::{merge_schemas, DeploymentSession};
pub use step::{PackageDetails, Step, StepKind};
