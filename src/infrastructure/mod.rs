//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! deployment logic: configuration, logging setup, local paths and the
//! composition root.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root wiring adapters into the service
//! - [`config`] - Configuration loading, validation and secrets
//! - [`paths`] - Home-relative locations of key and token files

pub mod bootstrap;
pub mod config;
pub mod paths;
