//! Pre-flight collision gate.
//!
//! Before anything is provisioned, every input naming a primary resource
//! (project, droplet, VPC, domain, database) is checked against the target
//! account. Secondary inputs such as sizes, images or counts are never
//! independently collidable and skip the network round-trip.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::domain::{
    access_token_for, CollisionReport, CollisionResult, CollisionResults, InputSchema,
    InputValues, ProviderKind,
};
use crate::error::{Error, Result};
use crate::port::ProviderRegistry;

pub struct CollisionChecker {
    providers: ProviderRegistry,
}

impl CollisionChecker {
    #[must_use]
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    /// Check every input key declared in `schema` for a name collision.
    ///
    /// A failing provider call is captured per key as
    /// [`CollisionResult::Failed`] and does not stop the scan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAccessToken`] when a key needs a provider
    /// check but no access token input is available for that provider.
    pub async fn check(
        &self,
        schema: &InputSchema,
        inputs: &InputValues,
    ) -> Result<CollisionResults> {
        let mut results = CollisionResults::new();
        let mut tokens: HashMap<ProviderKind, &str> = HashMap::new();

        for (key, value) in inputs {
            let Some(def) = schema.get(key) else {
                continue;
            };

            let target = def
                .provider_kind()
                .zip(def.resource_kind())
                .filter(|(_, kind)| kind.is_primary());
            let Some((provider, kind)) = target else {
                results.insert(key.clone(), CollisionResult::Clear);
                continue;
            };

            let Some(client) = self.providers.get(provider) else {
                debug!(key = %key, provider = %provider, "no client registered, skipping");
                results.insert(key.clone(), CollisionResult::Clear);
                continue;
            };

            let name = match value.as_str() {
                Some("") => {
                    results.insert(key.clone(), CollisionResult::Clear);
                    continue;
                }
                Some(name) => name,
                None => {
                    results.insert(
                        key.clone(),
                        CollisionResult::failed(format!("expected a string name for {kind}")),
                    );
                    continue;
                }
            };

            let token = match tokens.get(&provider) {
                Some(token) => *token,
                None => {
                    let token = access_token_for(schema, inputs, provider).ok_or_else(|| {
                        Error::MissingAccessToken {
                            provider: provider.to_string(),
                        }
                    })?;
                    tokens.insert(provider, token);
                    token
                }
            };

            let result = match client.exists(kind, name, token).await {
                Ok(true) => CollisionResult::exists(format!("Resource already exists: {name}")),
                Ok(false) => CollisionResult::Clear,
                Err(e) => CollisionResult::failed(e.to_string()),
            };
            debug!(key = %key, kind = %kind, ?result, "collision checked");
            results.insert(key.clone(), result);
        }

        Ok(results)
    }

    /// Run the check as a gate ahead of the step runner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collision`] listing every conflicting key when any
    /// resource already exists, or the error from [`check`](Self::check).
    pub async fn gate(
        &self,
        schema: &InputSchema,
        inputs: &InputValues,
    ) -> Result<CollisionResults> {
        let results = self.check(schema, inputs).await?;

        for (key, result) in &results {
            if let CollisionResult::Failed { message } = result {
                warn!(key = %key, message = %message, "collision check failed");
            }
        }

        if let Some(report) = CollisionReport::from_results(&results) {
            warn!(conflicts = ?report.keys(), "resources already exist, aborting run");
            return Err(Error::Collision(report));
        }

        info!(checked = results.len(), "collision gate passed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::ResourceKind;
    use crate::testkit::domain::{access_token, input, schema};
    use crate::testkit::provider::{FakeProvider, ProviderCall};
    use serde_json::json;

    fn checker(provider: FakeProvider) -> CollisionChecker {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(provider));
        CollisionChecker::new(registry)
    }

    #[tokio::test]
    async fn secondary_inputs_skip_the_network() {
        let provider = FakeProvider::new();
        let calls = provider.calls();
        let checker = checker(provider);
        let schema = schema(&[("token", access_token()), ("region", input("region"))]);
        let inputs = InputValues::from([
            ("token".to_string(), json!("t")),
            ("region".to_string(), json!("us")),
        ]);

        let results = checker.check(&schema, &inputs).await.unwrap();

        assert_eq!(results["token"], CollisionResult::Clear);
        assert_eq!(results["region"], CollisionResult::Clear);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn existing_resource_is_reported() {
        let checker =
            checker(FakeProvider::new().with_existing(ResourceKind::Droplet, "web-1"));
        let schema = schema(&[("token", access_token()), ("droplet", input("droplet"))]);
        let inputs = InputValues::from([
            ("token".to_string(), json!("t")),
            ("droplet".to_string(), json!("web-1")),
        ]);

        let results = checker.check(&schema, &inputs).await.unwrap();
        assert_eq!(
            results["droplet"],
            CollisionResult::exists("Resource already exists: web-1")
        );
    }

    #[tokio::test]
    async fn provider_failure_is_isolated_per_key() {
        let provider = FakeProvider::new()
            .failing_on(ResourceKind::Project)
            .with_existing(ResourceKind::Database, "db");
        let checker = checker(provider);
        let schema = schema(&[
            ("token", access_token()),
            ("project", input("project")),
            ("db", input("database")),
        ]);
        let inputs = InputValues::from([
            ("token".to_string(), json!("t")),
            ("project".to_string(), json!("p")),
            ("db".to_string(), json!("db")),
        ]);

        let results = checker.check(&schema, &inputs).await.unwrap();
        assert!(matches!(results["project"], CollisionResult::Failed { .. }));
        assert!(results["db"].is_collision());
    }

    #[tokio::test]
    async fn missing_token_is_fatal_when_a_check_is_needed() {
        let checker = checker(FakeProvider::new());
        let schema = schema(&[("token", access_token()), ("project", input("project"))]);
        let inputs = InputValues::from([("project".to_string(), json!("p"))]);

        let err = checker.check(&schema, &inputs).await.unwrap_err();
        assert!(matches!(err, Error::MissingAccessToken { .. }));
    }

    #[tokio::test]
    async fn missing_token_is_fine_without_primary_inputs() {
        let checker = checker(FakeProvider::new());
        let schema = schema(&[("size", input("size"))]);
        let inputs = InputValues::from([("size".to_string(), json!("s-1vcpu-1gb"))]);

        let results = checker.check(&schema, &inputs).await.unwrap();
        assert_eq!(results["size"], CollisionResult::Clear);
    }

    #[tokio::test]
    async fn inputs_outside_the_schema_are_ignored() {
        let checker = checker(FakeProvider::new());
        let inputs = InputValues::from([("stray".to_string(), json!("x"))]);

        let results = checker.check(&InputSchema::new(), &inputs).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn gate_aggregates_every_conflict() {
        let provider = FakeProvider::new()
            .with_existing(ResourceKind::Droplet, "web")
            .with_existing(ResourceKind::Project, "proj");
        let calls = provider.calls();
        let checker = checker(provider);
        let schema = schema(&[
            ("token", access_token()),
            ("droplet", input("droplet")),
            ("project", input("project")),
        ]);
        let inputs = InputValues::from([
            ("token".to_string(), json!("t")),
            ("droplet".to_string(), json!("web")),
            ("project".to_string(), json!("proj")),
        ]);

        let err = checker.gate(&schema, &inputs).await.unwrap_err();
        let Error::Collision(report) = err else {
            panic!("expected collision error");
        };
        assert_eq!(report.keys(), vec!["droplet", "project"]);
        assert!(calls
            .lock()
            .iter()
            .all(|call| matches!(call, ProviderCall::Exists { token, .. } if token == "t")));
    }
}
