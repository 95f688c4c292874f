//! Tofuhub - sequential deployment of containerized infrastructure packages.
//!
//! A deployment session is built from catalog packages, checked for cloud
//! resource name collisions, and then executed step by step: each step's
//! package is cloned, credentials are provisioned to the providers it
//! targets, and its container runs to completion while output is streamed
//! to attached observers.
//!
//! # Architecture
//!
//! - [`domain`] - Steps, input schemas, collision results, execution plans
//! - [`port`] - Traits for the catalog, providers, repository host, git and
//!   the container runtime
//! - [`adapter`] - HTTP, DigitalOcean, GitHub, git and docker compose
//!   implementations plus the CLI
//! - [`application`] - State store, collision gate, credential provisioning,
//!   materialization, the step runner and the log broadcaster
//! - [`infrastructure`] - Configuration, logging and wiring
//!
//! # Features
//!
//! - `testkit` - In-memory fakes for every port, for integration tests
//!
//! # Example
//!
//! ```no_run
//! use tofuhub::infrastructure::bootstrap::build_service;
//! use tofuhub::infrastructure::config::{Config, Secrets};
//!
//! # async fn demo() -> tofuhub::error::Result<()> {
//! let config = Config::load_or_default("tofuhub.toml")?;
//! let service = build_service(&config, &Secrets::from_env(None)).await?;
//! service.init_session(&["lorawan-stack".to_string()]).await?;
//! let report = service.run().await?;
//! println!("deployed {:?}", report.executed);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
