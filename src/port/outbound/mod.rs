//! Outbound ports (driven side): interfaces implemented by outbound adapters.

pub mod catalog;
pub mod executor;
pub mod log;
pub mod provider;
pub mod repository;
pub mod source;
