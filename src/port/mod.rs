//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points the orchestration pipeline is wired
//! through. Everything outside the core (the package catalog, cloud
//! provider APIs, the repository host, git and the container runtime) is
//! reached through one of these traits.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  State / Gate / Runner  ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │ Catalog │            │  Provider   │              │ Execution │
//! │ Adapter │            │  Adapters   │              │  Backend  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod outbound;

pub use outbound::catalog::PackageCatalog;
pub use outbound::executor::ExecutionBackend;
pub use outbound::log::LogSink;
pub use outbound::provider::{ProviderClient, ProviderRegistry};
pub use outbound::repository::{CreatedRepository, RepositoryHost};
pub use outbound::source::SourceControl;
