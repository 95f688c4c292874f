//! DigitalOcean API payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ResourceKind;

/// `POST /account/keys` body.
#[derive(Debug, Serialize)]
pub struct NewSshKey<'a> {
    pub name: &'a str,
    pub public_key: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SshKeyEnvelope {
    pub ssh_key: SshKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshKey {
    pub id: u64,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub public_key: String,
}

/// One page of a list endpoint.
///
/// Items are kept as raw JSON because each collection has its own shape;
/// only the name field is read.
#[derive(Debug)]
pub struct ListPage {
    pub items: Vec<Value>,
    pub next: Option<String>,
}

impl ListPage {
    pub fn from_body(body: &Value, collection: &str) -> Self {
        let items = body
            .get(collection)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let next = body
            .pointer("/links/pages/next")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        Self { items, next }
    }
}

/// List endpoint and response key for a resource kind.
pub const fn collection(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Project => "projects",
        ResourceKind::Droplet => "droplets",
        ResourceKind::Vpc => "vpcs",
        ResourceKind::Domain => "domains",
        ResourceKind::Database => "databases",
        ResourceKind::Firewall => "firewalls",
        ResourceKind::LoadBalancer => "load_balancers",
        ResourceKind::Volume => "volumes",
        ResourceKind::App => "apps",
    }
}

/// Name of a listed resource. Apps carry it under `spec.name`.
pub fn resource_name(kind: ResourceKind, item: &Value) -> Option<&str> {
    let field = match kind {
        ResourceKind::App => item.pointer("/spec/name"),
        _ => item.get("name"),
    };
    field.and_then(Value::as_str)
}
