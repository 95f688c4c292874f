//! Execution environment materialization.
//!
//! For one step: stage the package source locally, optionally mirror it to
//! the user's repository host, require a build descriptor at the repository
//! root and describe the container run as a typed [`ExecutionPlan`].

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use crate::domain::{
    render_value, CredentialMap, ExecutionPlan, InputValues, PortBinding, Step, StepKind,
    VolumeMount,
};
use crate::error::{MaterializationError, Result};
use crate::port::{RepositoryHost, SourceControl};

/// Container path of the user's key material.
pub const KEY_MOUNT: &str = "/root/.ssh";
/// Container path of the step's output staging directory.
pub const OUTPUT_MOUNT: &str = "/tofuhub/output";
/// Container path of the container runtime's control socket.
pub const DOCKER_SOCKET_MOUNT: &str = "/var/run/docker.sock";

/// Branch pushed to mirrored repositories.
const MIRROR_BRANCH: &str = "main";

#[derive(Debug, Clone)]
pub struct MaterializerSettings {
    /// Directory package sources are cloned into.
    pub staging_root: PathBuf,
    /// Directory holding per-step output artifacts.
    pub output_dir: PathBuf,
    /// File that must exist at the repository root.
    pub build_descriptor: String,
    pub compose_file: String,
    pub service: String,
    /// Host directory with the user's key material, mounted read-only.
    pub key_dir: PathBuf,
    pub private_key_file: String,
    pub ports: Vec<PortBinding>,
    /// Control socket to mount into the container, if any.
    pub docker_socket: Option<PathBuf>,
    pub build_image: bool,
    /// Environment shared by every step (e.g. the repository host token).
    pub extra_env: BTreeMap<String, String>,
}

impl Default for MaterializerSettings {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::from("tofuhub"),
            output_dir: PathBuf::from("tofuhub/output"),
            build_descriptor: "Dockerfile".into(),
            compose_file: "docker-compose.yml".into(),
            service: "tofuhub-worker".into(),
            key_dir: PathBuf::from("~/.ssh"),
            private_key_file: "id_rsa".into(),
            ports: vec![PortBinding {
                host: 6080,
                container: 6080,
            }],
            docker_socket: None,
            build_image: false,
            extra_env: BTreeMap::new(),
        }
    }
}

pub struct ExecutionMaterializer {
    source: Arc<dyn SourceControl>,
    mirror: Option<Arc<dyn RepositoryHost>>,
    settings: MaterializerSettings,
}

impl ExecutionMaterializer {
    #[must_use]
    pub fn new(source: Arc<dyn SourceControl>, settings: MaterializerSettings) -> Self {
        Self {
            source,
            mirror: None,
            settings,
        }
    }

    /// Mirror `PACKAGE` steps to `host` before running them.
    #[must_use]
    pub fn with_mirror(mut self, host: Arc<dyn RepositoryHost>) -> Self {
        self.mirror = Some(host);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &MaterializerSettings {
        &self.settings
    }

    /// Prepare the execution environment of `step`.
    ///
    /// # Errors
    ///
    /// Every failure is a [`MaterializationError`] and terminates the run:
    /// staging directories that cannot be created, an unreachable
    /// repository, a failed mirror or a missing build descriptor.
    pub async fn materialize(
        &self,
        step: &Step,
        repository_url: &str,
        inputs: &InputValues,
        credentials: &CredentialMap,
    ) -> Result<ExecutionPlan> {
        let settings = &self.settings;
        require_plain_name("name", &step.name)?;
        require_plain_name("package", &step.package)?;

        let staging_root = absolute(&settings.staging_root)?;
        ensure_dir(&staging_root).await?;
        let output_dir = absolute(&settings.output_dir)?.join(&step.name);
        ensure_dir(&output_dir).await?;

        let checkout = staging_root.join(&step.package);
        self.stage_source(repository_url, &checkout).await?;

        let working_dir = match (&self.mirror, step.kind) {
            (Some(host), StepKind::Package) => {
                self.mirror_source(host.as_ref(), step, &checkout).await?
            }
            _ => checkout,
        };

        let descriptor = working_dir.join(&settings.build_descriptor);
        if !tokio::fs::try_exists(&descriptor).await.unwrap_or(false) {
            return Err(MaterializationError::MissingDescriptor {
                descriptor: settings.build_descriptor.clone(),
                dir: working_dir,
            }
            .into());
        }

        // Compose reads relative bind sources as named volumes.
        let mut mounts = vec![
            VolumeMount::read_only(absolute(&settings.key_dir)?, KEY_MOUNT),
            VolumeMount::read_write(&output_dir, OUTPUT_MOUNT),
        ];
        if let Some(socket) = &settings.docker_socket {
            mounts.push(VolumeMount::read_write(absolute(socket)?, DOCKER_SOCKET_MOUNT));
        }

        let plan = ExecutionPlan {
            step: step.name.clone(),
            service: settings.service.clone(),
            working_dir,
            compose_file: settings.compose_file.clone(),
            image: format!("tofuhub-{}", step.name),
            build: settings.build_image,
            env: self.environment(step, inputs, credentials),
            ports: settings.ports.clone(),
            mounts,
        };
        debug!(step = %step.name, env = ?plan.env_keys(), "execution plan ready");
        Ok(plan)
    }

    async fn stage_source(&self, url: &str, checkout: &Path) -> Result<()> {
        if tokio::fs::try_exists(checkout).await.unwrap_or(false) {
            debug!(path = %checkout.display(), "removing stale checkout");
            tokio::fs::remove_dir_all(checkout)
                .await
                .map_err(|source| MaterializationError::Staging {
                    path: checkout.to_path_buf(),
                    source,
                })?;
        }

        info!(repo = %url, path = %checkout.display(), "cloning package source");
        self.source
            .clone_repo(url, checkout)
            .await
            .map_err(|e| MaterializationError::Clone {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Push a private copy of the checkout to the repository host.
    ///
    /// The repository is named after the step; a taken name gets a random
    /// suffix. The checkout is renamed to match and its new path returned.
    async fn mirror_source(
        &self,
        host: &dyn RepositoryHost,
        step: &Step,
        checkout: &Path,
    ) -> Result<PathBuf> {
        let mirror_err = |reason: String| MaterializationError::Mirror {
            name: step.name.clone(),
            reason,
        };

        let mut name = step.name.clone();
        if host.exists(&name).await.map_err(|e| mirror_err(e.to_string()))? {
            name = unique_name(&step.name);
            info!(base = %step.name, name = %name, "repository name taken, using suffix");
        }

        let target = checkout.with_file_name(&name);
        if target != checkout {
            if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                tokio::fs::remove_dir_all(&target)
                    .await
                    .map_err(|e| mirror_err(e.to_string()))?;
            }
            tokio::fs::rename(checkout, &target)
                .await
                .map_err(|e| mirror_err(e.to_string()))?;
        }

        let created = host
            .create(&name)
            .await
            .map_err(|e| mirror_err(e.to_string()))?;
        self.source
            .push(&target, &host.authenticated_url(&created.clone_url), MIRROR_BRANCH)
            .await
            .map_err(|e| mirror_err(e.to_string()))?;

        info!(step = %step.name, repo = %created.html_url, "repository mirrored");
        Ok(target)
    }

    /// Session inputs, then schema defaults for keys the user left unset,
    /// then credential identifiers and derived paths.
    fn environment(
        &self,
        step: &Step,
        inputs: &InputValues,
        credentials: &CredentialMap,
    ) -> BTreeMap<String, String> {
        let mut env = self.settings.extra_env.clone();

        for (key, value) in inputs {
            env.insert(key.clone(), render_value(value));
        }
        for (key, def) in &step.input_schema {
            if inputs.contains_key(key) {
                continue;
            }
            if let Some(default) = &def.default {
                env.insert(key.clone(), render_value(default));
            }
        }

        for (provider, id) in credentials {
            env.insert(format!("{}_SSH_KEY_ID", provider.env_prefix()), id.clone());
        }

        env.insert(
            "PRIVATE_KEY_PATH".into(),
            format!("{KEY_MOUNT}/{}", self.settings.private_key_file),
        );
        env.insert("OUTPUT_DIR".into(), OUTPUT_MOUNT.into());
        env
    }
}

/// Step names and package names become directory names under the
/// workspace, so each must be exactly one normal path component.
fn require_plain_name(field: &'static str, value: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    let plain = !value.contains(['/', '\\'])
        && matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
    if plain {
        Ok(())
    } else {
        Err(MaterializationError::InvalidName {
            field,
            value: value.to_owned(),
        }
        .into())
    }
}

/// `path` anchored at the current directory when relative.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| MaterializationError::Staging {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| MaterializationError::Staging {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

fn unique_name(base: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{base}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InputDef, ProviderKind};
    use crate::error::Error;
    use crate::testkit::domain::{input, schema};
    use crate::testkit::source::{FakeRepositoryHost, FakeSourceControl};
    use serde_json::json;

    fn settings(root: &Path) -> MaterializerSettings {
        MaterializerSettings {
            staging_root: root.join("stage"),
            output_dir: root.join("out"),
            key_dir: root.join("keys"),
            ..MaterializerSettings::default()
        }
    }

    fn step(kind: StepKind) -> Step {
        let mut input_schema = schema(&[("region", input("region"))]);
        input_schema.insert(
            "size".into(),
            InputDef {
                default: Some(json!("s-1vcpu-1gb")),
                ..InputDef::default()
            },
        );
        Step {
            name: "lorawan".into(),
            package: "lorawan-pkg".into(),
            kind,
            repository: Some("https://git.example/lorawan.git".into()),
            input_schema,
        }
    }

    #[tokio::test]
    async fn builds_plan_with_env_mounts_and_ports() {
        let dir = tempfile::tempdir().unwrap();
        let materializer =
            ExecutionMaterializer::new(Arc::new(FakeSourceControl::new()), settings(dir.path()));
        let inputs = InputValues::from([
            ("region".to_string(), json!("nyc3")),
            ("unrelated".to_string(), json!("x")),
        ]);
        let credentials = CredentialMap::from([(ProviderKind::DigitalOcean, "77".to_string())]);

        let plan = materializer
            .materialize(&step(StepKind::Agent), "https://git.example/l.git", &inputs, &credentials)
            .await
            .unwrap();

        assert_eq!(plan.working_dir, dir.path().join("stage").join("lorawan-pkg"));
        assert_eq!(plan.env["region"], "nyc3");
        assert_eq!(plan.env["size"], "s-1vcpu-1gb");
        assert_eq!(plan.env["DIGITALOCEAN_SSH_KEY_ID"], "77");
        assert_eq!(plan.env["PRIVATE_KEY_PATH"], "/root/.ssh/id_rsa");
        assert_eq!(plan.env["unrelated"], "x");
        assert_eq!(plan.ports[0].to_string(), "6080:6080");
        assert_eq!(plan.mounts.len(), 2);
        assert!(plan.mounts[0].read_only);
        assert!(dir.path().join("out").join("lorawan").is_dir());
    }

    #[tokio::test]
    async fn missing_descriptor_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSourceControl::new().without_descriptor();
        let materializer = ExecutionMaterializer::new(Arc::new(source), settings(dir.path()));

        let err = materializer
            .materialize(&step(StepKind::Agent), "u", &InputValues::new(), &CredentialMap::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Materialization(MaterializationError::MissingDescriptor { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_repository_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSourceControl::new().failing_clone("https://gone.example/x.git");
        let materializer = ExecutionMaterializer::new(Arc::new(source), settings(dir.path()));

        let err = materializer
            .materialize(
                &step(StepKind::Agent),
                "https://gone.example/x.git",
                &InputValues::new(),
                &CredentialMap::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Materialization(MaterializationError::Clone { .. })
        ));
    }

    #[tokio::test]
    async fn package_steps_are_mirrored_under_a_unique_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSourceControl::new();
        let pushes = source.pushes();
        let host = FakeRepositoryHost::new().with_existing("lorawan");
        let created = host.created();
        let materializer = ExecutionMaterializer::new(Arc::new(source), settings(dir.path()))
            .with_mirror(Arc::new(host));

        let plan = materializer
            .materialize(&step(StepKind::Package), "u", &InputValues::new(), &CredentialMap::new())
            .await
            .unwrap();

        let created = created.lock().clone();
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with("lorawan-"));
        assert_eq!(created[0].len(), "lorawan-".len() + 4);
        assert_eq!(plan.working_dir, dir.path().join("stage").join(&created[0]));
        assert_eq!(pushes.lock()[0].1, "main");
    }

    #[tokio::test]
    async fn agent_steps_are_not_mirrored() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeRepositoryHost::new();
        let created = host.created();
        let materializer =
            ExecutionMaterializer::new(Arc::new(FakeSourceControl::new()), settings(dir.path()))
                .with_mirror(Arc::new(host));

        materializer
            .materialize(&step(StepKind::Agent), "u", &InputValues::new(), &CredentialMap::new())
            .await
            .unwrap();
        assert!(created.lock().is_empty());
    }

    #[tokio::test]
    async fn relative_workspace_paths_are_mounted_as_absolute_binds() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let relative = PathBuf::from(dir.path().file_name().unwrap());
        let materializer = ExecutionMaterializer::new(
            Arc::new(FakeSourceControl::new()),
            MaterializerSettings {
                staging_root: relative.join("stage"),
                output_dir: relative.join("out"),
                key_dir: relative.join("keys"),
                docker_socket: Some(PathBuf::from("run/docker.sock")),
                ..MaterializerSettings::default()
            },
        );

        let plan = materializer
            .materialize(&step(StepKind::Agent), "u", &InputValues::new(), &CredentialMap::new())
            .await
            .unwrap();

        assert_eq!(plan.mounts.len(), 3);
        for mount in &plan.mounts {
            assert!(mount.source.is_absolute(), "{}", mount.source.display());
        }
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(plan.mounts[1].source, cwd.join(&relative).join("out").join("lorawan"));
        assert!(plan.working_dir.is_absolute());
    }

    #[tokio::test]
    async fn names_that_escape_the_workspace_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let materializer =
            ExecutionMaterializer::new(Arc::new(FakeSourceControl::new()), settings(dir.path()));
        let escaped = dir.path().join("escaped");

        for (name, package) in [
            (escaped.to_string_lossy().into_owned(), "pkg".to_string()),
            ("../..".to_string(), "pkg".to_string()),
            ("a/b".to_string(), "pkg".to_string()),
            (".".to_string(), "pkg".to_string()),
            ("lorawan".to_string(), "../stage".to_string()),
            ("lorawan".to_string(), String::new()),
        ] {
            let mut step = step(StepKind::Agent);
            step.name = name.clone();
            step.package = package;

            let err = materializer
                .materialize(&step, "u", &InputValues::new(), &CredentialMap::new())
                .await
                .unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Materialization(MaterializationError::InvalidName { .. })
                ),
                "{name}: {err}"
            );
        }
        assert!(!escaped.exists());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn plain_names_are_accepted() {
        for name in ["lorawan", "k8s-cluster_v2", "stack.prod"] {
            assert!(require_plain_name("name", name).is_ok(), "{name}");
        }
    }

    #[test]
    fn unique_names_keep_the_base() {
        let name = unique_name("stack");
        assert!(name.starts_with("stack-"));
        assert!(name[6..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
