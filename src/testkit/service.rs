//! Fully faked [`DeploymentService`] for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::backend::ScriptedBackend;
use super::catalog::StaticCatalog;
use super::provider::{FakeProvider, ProviderCall};
use super::source::{FakeRepositoryHost, FakeSourceControl};
use crate::application::{
    CollisionChecker, CredentialProvisioner, DeploymentService, ExecutionMaterializer,
    LogBroadcaster, MaterializerSettings, StateStore, StepRunner,
};
use crate::domain::ExecutionPlan;
use crate::port::ProviderRegistry;

/// Public key written by [`ServiceBuilder::build`].
pub const PUBLIC_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2E test@tofuhub";

/// Shared views into the fakes behind a built service.
pub struct Probes {
    pub plans: Arc<Mutex<Vec<ExecutionPlan>>>,
    pub provider_calls: Arc<Mutex<Vec<ProviderCall>>>,
    pub clones: Arc<Mutex<Vec<String>>>,
    pub pushes: Arc<Mutex<Vec<(String, String)>>>,
    pub mirrored: Option<Arc<Mutex<Vec<String>>>>,
}

/// Wires fakes for every port into a [`DeploymentService`] rooted at a
/// caller-provided directory.
pub struct ServiceBuilder {
    root: PathBuf,
    catalog: StaticCatalog,
    provider: FakeProvider,
    source: FakeSourceControl,
    host: Option<FakeRepositoryHost>,
    backend: ScriptedBackend,
    with_public_key: bool,
}

impl ServiceBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            catalog: StaticCatalog::new(),
            provider: FakeProvider::new(),
            source: FakeSourceControl::new(),
            host: None,
            backend: ScriptedBackend::new(),
            with_public_key: true,
        }
    }

    pub fn catalog(mut self, catalog: StaticCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn provider(mut self, provider: FakeProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn source(mut self, source: FakeSourceControl) -> Self {
        self.source = source;
        self
    }

    pub fn mirror(mut self, host: FakeRepositoryHost) -> Self {
        self.host = Some(host);
        self
    }

    pub fn backend(mut self, backend: ScriptedBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Do not write a public key; credential provisioning is skipped.
    pub fn without_public_key(mut self) -> Self {
        self.with_public_key = false;
        self
    }

    pub fn settings(&self) -> MaterializerSettings {
        MaterializerSettings {
            staging_root: self.root.join("stage"),
            output_dir: self.root.join("output"),
            key_dir: self.root.join("keys"),
            ..MaterializerSettings::default()
        }
    }

    pub fn build(self) -> (DeploymentService, Probes) {
        let settings = self.settings();
        let public_key_path = settings.key_dir.join("id_rsa.pub");
        if self.with_public_key {
            std::fs::create_dir_all(&settings.key_dir).ok();
            std::fs::write(&public_key_path, format!("{PUBLIC_KEY}\n")).ok();
        }

        let probes = Probes {
            plans: self.backend.plans(),
            provider_calls: self.provider.calls(),
            clones: self.source.clones(),
            pushes: self.source.pushes(),
            mirrored: self.host.as_ref().map(FakeRepositoryHost::created),
        };

        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(self.provider));

        let mut materializer = ExecutionMaterializer::new(Arc::new(self.source), settings);
        if let Some(host) = self.host {
            materializer = materializer.with_mirror(Arc::new(host));
        }

        let broadcaster = Arc::new(LogBroadcaster::new());
        let runner = StepRunner::new(
            CollisionChecker::new(providers.clone()),
            CredentialProvisioner::new(providers, "tofuhub"),
            materializer,
            Arc::new(self.backend),
            Arc::clone(&broadcaster),
            public_key_path,
        );
        let service =
            DeploymentService::new(StateStore::new(Arc::new(self.catalog)), runner, broadcaster);
        (service, probes)
    }
}
