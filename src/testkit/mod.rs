//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`]: Builders for input definitions, schemas and packages.
//! - [`catalog`]: `StaticCatalog`, an in-memory [`PackageCatalog`](crate::port::PackageCatalog).
//! - [`provider`]: `FakeProvider`, recording every existence check and key upload.
//! - [`source`]: `FakeSourceControl` and `FakeRepositoryHost` working on a temp dir.
//! - [`backend`]: `ScriptedBackend` with per-step exit codes and output,
//!   plus `RecordingSink`.
//! - [`service`]: `ServiceBuilder`, a `DeploymentService` wired to all of the above.

pub mod backend;
pub mod catalog;
pub mod domain;
pub mod provider;
pub mod service;
pub mod source;
