//! Composition root: wires concrete adapters into a [`DeploymentService`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::{debug, info, warn};

use crate::adapter::outbound::catalog::HttpCatalog;
use crate::adapter::outbound::compose::ComposeBackend;
use crate::adapter::outbound::digitalocean::DigitalOcean;
use crate::adapter::outbound::git::GitCli;
use crate::adapter::outbound::github::GitHub;
use crate::application::{
    CollisionChecker, CredentialProvisioner, DeploymentService, ExecutionMaterializer,
    LogBroadcaster, MaterializerSettings, StateStore, StepRunner,
};
use crate::error::Result;
use crate::infrastructure::config::secrets::GITHUB_TOKEN_ENV;
use crate::infrastructure::config::{Config, Secrets};
use crate::port::ProviderRegistry;

/// Build the shared HTTP client used by every outbound API adapter.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client(config: &Config) -> Result<HttpClient> {
    let client = HttpClient::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()?;
    Ok(client)
}

/// Registry with every provider client this build supports.
#[must_use]
pub fn provider_registry(http: &HttpClient) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(DigitalOcean::new(http.clone())));
    registry
}

/// Translate configuration into materializer settings.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`](crate::error::ConfigError::InvalidValue)
/// for malformed port bindings.
pub fn materializer_settings(config: &Config, secrets: &Secrets) -> Result<MaterializerSettings> {
    let mut extra_env = BTreeMap::new();
    if let Some(token) = &secrets.github_token {
        extra_env.insert(GITHUB_TOKEN_ENV.to_owned(), token.clone());
    }

    Ok(MaterializerSettings {
        staging_root: config.workspace.staging_root.clone(),
        output_dir: config.workspace.output_dir.clone(),
        build_descriptor: config.workspace.build_descriptor.clone(),
        compose_file: config.workspace.compose_file.clone(),
        service: config.workspace.service.clone(),
        key_dir: config.credentials.key_dir(),
        private_key_file: config.credentials.private_key_file.clone(),
        ports: config.execution.port_bindings()?,
        docker_socket: config
            .execution
            .mount_docker_socket
            .then(|| config.execution.docker_socket.clone()),
        build_image: config.execution.build_image,
        extra_env,
    })
}

/// Remove the staging root when `workspace.clean_on_start` is set.
///
/// # Errors
///
/// Returns an error if an existing staging root cannot be removed.
pub async fn clean_workspace(config: &Config) -> Result<()> {
    let root = &config.workspace.staging_root;
    if !config.workspace.clean_on_start {
        return Ok(());
    }
    if tokio::fs::try_exists(root).await.unwrap_or(false) {
        info!(path = %root.display(), "cleaning staging root");
        tokio::fs::remove_dir_all(root).await?;
    }
    Ok(())
}

/// Assemble the deployment service from configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the configuration
/// holds invalid values or the workspace cannot be cleaned.
pub async fn build_service(config: &Config, secrets: &Secrets) -> Result<DeploymentService> {
    clean_workspace(config).await?;

    let http = http_client(config)?;
    let catalog = Arc::new(HttpCatalog::new(
        http.clone(),
        config.catalog.base_url.clone(),
        secrets.catalog_token.clone(),
    ));
    let store = StateStore::new(catalog);

    let providers = provider_registry(&http);
    debug!(providers = ?providers, "provider clients registered");

    let mut materializer = ExecutionMaterializer::new(
        Arc::new(GitCli::new()),
        materializer_settings(config, secrets)?,
    );
    match (&secrets.github_token, config.mirror.enabled) {
        (Some(token), true) => {
            info!(org = ?config.mirror.org, "repository mirroring enabled");
            materializer = materializer.with_mirror(Arc::new(GitHub::new(
                http.clone(),
                token.clone(),
                config.mirror.org.clone(),
            )));
        }
        (None, true) => warn!("mirroring enabled but no GitHub token found, skipping"),
        (_, false) => debug!("repository mirroring disabled"),
    }

    let broadcaster = Arc::new(LogBroadcaster::new());
    let backend = Arc::new(ComposeBackend::new(Duration::from_secs(
        config.execution.timeout_secs,
    )));

    let runner = StepRunner::new(
        CollisionChecker::new(providers.clone()),
        CredentialProvisioner::new(providers, config.credentials.key_name.clone()),
        materializer,
        backend,
        Arc::clone(&broadcaster),
        config.credentials.public_key_path(),
    );

    Ok(DeploymentService::new(store, runner, broadcaster))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_token_is_passed_to_steps() {
        let secrets = Secrets {
            catalog_token: String::new(),
            github_token: Some("gh".into()),
        };
        let settings = materializer_settings(&Config::default(), &secrets).unwrap();
        assert_eq!(settings.extra_env[GITHUB_TOKEN_ENV], "gh");
        assert!(settings.docker_socket.is_none());
    }

    #[test]
    fn docker_socket_is_opt_in() {
        let mut config = Config::default();
        config.execution.mount_docker_socket = true;
        let settings = materializer_settings(&config, &Secrets::default()).unwrap();
        assert_eq!(
            settings.docker_socket.as_deref(),
            Some(std::path::Path::new("/var/run/docker.sock"))
        );
    }

    #[tokio::test]
    async fn clean_on_start_removes_staging_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.workspace.staging_root = dir.path().join("stage");
        std::fs::create_dir_all(config.workspace.staging_root.join("old")).unwrap();

        clean_workspace(&config).await.unwrap();
        assert!(config.workspace.staging_root.exists());

        config.workspace.clean_on_start = true;
        clean_workspace(&config).await.unwrap();
        assert!(!config.workspace.staging_root.exists());
    }

    #[tokio::test]
    async fn service_builds_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.workspace.staging_root = dir.path().join("stage");
        let service = build_service(&config, &Secrets::default()).await.unwrap();
        assert!(service.get_state().is_empty());
        assert!(!service.is_running());
    }
}
