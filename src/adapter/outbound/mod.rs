//! Outbound adapters (driven side).

pub mod catalog;
pub mod compose;
pub mod digitalocean;
pub mod git;
pub mod github;
