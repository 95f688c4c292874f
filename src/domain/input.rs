//! Input schema types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::provider::{ProviderKind, ResourceKind};

/// Primitive tag marking the credential used to talk to a provider.
pub const ACCESS_TOKEN: &str = "access_token";

/// Declared inputs keyed by variable name.
pub type InputSchema = BTreeMap<String, InputDef>;

/// User-supplied input values keyed by variable name.
pub type InputValues = BTreeMap<String, serde_json::Value>;

/// Value type declared for an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    String,
    Number,
    Boolean,
    List,
    Map,
    #[serde(other)]
    Other,
}

/// Describes one configurable value of a package.
///
/// `provider` and `primitive` together decide whether a collision check or a
/// credential push applies to the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputDef {
    #[serde(rename = "type", default)]
    pub kind: InputKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputDef {
    /// Parsed provider tag, if it names a known provider.
    #[must_use]
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        self.provider.as_deref().and_then(|p| p.parse().ok())
    }

    /// Resource kind named by the primitive tag, if any.
    #[must_use]
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        self.primitive.as_deref().and_then(ResourceKind::from_primitive)
    }

    #[must_use]
    pub fn is_access_token(&self) -> bool {
        self.primitive.as_deref() == Some(ACCESS_TOKEN)
    }

    /// Whether this input names a resource that can collide with an existing one.
    #[must_use]
    pub fn is_collision_checked(&self) -> bool {
        self.provider_kind().is_some() && self.resource_kind().is_some_and(ResourceKind::is_primary)
    }
}

/// Locate the access token supplied for `provider`.
///
/// The token is the value of the first schema entry tagged
/// `primitive = "access_token"` for that provider with a non-empty string
/// input.
#[must_use]
pub fn access_token_for<'a>(
    schema: &InputSchema,
    inputs: &'a InputValues,
    provider: ProviderKind,
) -> Option<&'a str> {
    schema
        .iter()
        .filter(|(_, def)| def.is_access_token() && def.provider_kind() == Some(provider))
        .find_map(|(key, _)| {
            inputs
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|token| !token.is_empty())
        })
}

/// Render an input value the way it is handed to a subprocess environment.
///
/// Strings pass through verbatim; everything else is rendered as JSON.
#[must_use]
pub fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_catalog_input_definition() {
        let def: InputDef = serde_json::from_value(json!({
            "type": "string",
            "required": false,
            "default": "",
            "description": "Digital ocean access token",
            "primitive": "access_token",
            "provider": "digitalocean",
            "secret": true
        }))
        .unwrap();

        assert!(def.is_access_token());
        assert!(def.secret);
        assert_eq!(def.provider_kind(), Some(ProviderKind::DigitalOcean));
        assert!(!def.is_collision_checked());
    }

    #[test]
    fn unknown_type_tag_is_tolerated() {
        let def: InputDef = serde_json::from_value(json!({ "type": "secret-file" })).unwrap();
        assert_eq!(def.kind, InputKind::Other);
    }

    #[test]
    fn secondary_primitives_are_not_collision_checked() {
        for primitive in ["size", "image", "region", "username", "count"] {
            let def = InputDef {
                provider: Some("digitalocean".into()),
                primitive: Some(primitive.into()),
                ..InputDef::default()
            };
            assert!(!def.is_collision_checked(), "{primitive}");
        }
    }

    #[test]
    fn primary_primitive_with_unknown_provider_is_not_checked() {
        let def = InputDef {
            provider: Some("aws".into()),
            primitive: Some("droplet".into()),
            ..InputDef::default()
        };
        assert!(!def.is_collision_checked());
    }

    #[test]
    fn access_token_lookup_matches_provider() {
        let mut schema = InputSchema::new();
        schema.insert(
            "do_access_token".into(),
            InputDef {
                provider: Some("digitalocean".into()),
                primitive: Some(ACCESS_TOKEN.into()),
                ..InputDef::default()
            },
        );
        let mut inputs = InputValues::new();
        assert_eq!(access_token_for(&schema, &inputs, ProviderKind::DigitalOcean), None);

        inputs.insert("do_access_token".into(), json!(""));
        assert_eq!(access_token_for(&schema, &inputs, ProviderKind::DigitalOcean), None);

        inputs.insert("do_access_token".into(), json!("dop_v1_abc"));
        assert_eq!(
            access_token_for(&schema, &inputs, ProviderKind::DigitalOcean),
            Some("dop_v1_abc")
        );
    }

    #[test]
    fn empty_token_falls_through_to_the_next_token_key() {
        let token_def = InputDef {
            provider: Some("digitalocean".into()),
            primitive: Some(ACCESS_TOKEN.into()),
            ..InputDef::default()
        };
        let mut schema = InputSchema::new();
        schema.insert("a_token".into(), token_def.clone());
        schema.insert("b_token".into(), token_def);
        let inputs = InputValues::from([
            ("a_token".to_string(), json!("")),
            ("b_token".to_string(), json!("dop_v1_b")),
        ]);

        assert_eq!(
            access_token_for(&schema, &inputs, ProviderKind::DigitalOcean),
            Some("dop_v1_b")
        );
    }

    #[test]
    fn render_value_keeps_strings_raw() {
        assert_eq!(render_value(&json!("nyc3")), "nyc3");
        assert_eq!(render_value(&json!(3)), "3");
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&json!(null)), "");
    }
}
