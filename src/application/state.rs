//! Deployment session store.
//!
//! Holds the single deployment session owned by a [`DeploymentService`].
//! The store is the only writer of session state; other components read
//! snapshots and return derived, ephemeral results.
//!
//! [`DeploymentService`]: super::DeploymentService

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::domain::{merge_schemas, DeploymentSession, InputValues, Step};
use crate::error::Result;
use crate::port::PackageCatalog;

pub struct StateStore {
    catalog: Arc<dyn PackageCatalog>,
    session: RwLock<DeploymentSession>,
}

impl StateStore {
    #[must_use]
    pub fn new(catalog: Arc<dyn PackageCatalog>) -> Self {
        Self {
            catalog,
            session: RwLock::new(DeploymentSession::default()),
        }
    }

    /// Reset the session and populate it from the catalog.
    ///
    /// Steps are appended in the given order; their schemas are merged once
    /// all packages are fetched. On any failure the session is left empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`](crate::error::Error::Lookup) if a catalog
    /// fetch fails and [`Error::Conflict`](crate::error::Error::Conflict) if
    /// two packages declare the same variable key.
    pub async fn init(&self, packages: &[String]) -> Result<DeploymentSession> {
        self.reset();

        let mut steps = Vec::with_capacity(packages.len());
        for package in packages {
            match self.catalog.fetch(package).await {
                Ok(details) => steps.push(Step::from_package(package.clone(), details)),
                Err(e) => {
                    warn!(package = %package, error = %e, "catalog lookup failed");
                    self.reset();
                    return Err(e);
                }
            }
        }

        let variables = match merge_schemas(&steps) {
            Ok(variables) => variables,
            Err(e) => {
                warn!(error = %e, "input schemas conflict");
                self.reset();
                return Err(e);
            }
        };

        let mut session = self.session.write();
        session.steps = steps;
        session.variables = variables;
        info!(
            steps = session.steps.len(),
            variables = session.variables.len(),
            "session initialized"
        );
        Ok(session.clone())
    }

    /// Clear steps, variables and inputs.
    pub fn reset(&self) -> DeploymentSession {
        let mut session = self.session.write();
        *session = DeploymentSession::default();
        session.clone()
    }

    /// Replace the input map wholesale. No schema validation happens here.
    pub fn set_inputs(&self, values: InputValues) -> DeploymentSession {
        let mut session = self.session.write();
        session.inputs = values;
        session.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> DeploymentSession {
        self.session.read().clone()
    }
}
