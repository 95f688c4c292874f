//! Provider and resource kind tags.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// External cloud providers the orchestrator can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    DigitalOcean,
}

impl ProviderKind {
    /// Tag used in package input schemas.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DigitalOcean => "digitalocean",
        }
    }

    /// Prefix for environment variables derived from this provider.
    #[must_use]
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::DigitalOcean => "DIGITALOCEAN",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digitalocean" => Ok(Self::DigitalOcean),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Provider-scoped credential identifiers produced for a single run.
pub type CredentialMap = BTreeMap<ProviderKind, String>;

/// Named resource kinds a provider can report existence for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    Droplet,
    Vpc,
    Domain,
    Database,
    Firewall,
    LoadBalancer,
    Volume,
    App,
}

impl ResourceKind {
    /// Map a schema `primitive` tag to a resource kind.
    #[must_use]
    pub fn from_primitive(primitive: &str) -> Option<Self> {
        match primitive {
            "project" => Some(Self::Project),
            "droplet" | "vm" => Some(Self::Droplet),
            "vpc" | "network" => Some(Self::Vpc),
            "dns_zone" | "domain" => Some(Self::Domain),
            "database" => Some(Self::Database),
            "firewall" => Some(Self::Firewall),
            "load_balancer" => Some(Self::LoadBalancer),
            "volume" => Some(Self::Volume),
            "app" => Some(Self::App),
            _ => None,
        }
    }

    /// Primary kinds are independently name-collidable and gate a run.
    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(
            self,
            Self::Project | Self::Droplet | Self::Vpc | Self::Domain | Self::Database
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Droplet => "droplet",
            Self::Vpc => "vpc",
            Self::Domain => "domain",
            Self::Database => "database",
            Self::Firewall => "firewall",
            Self::LoadBalancer => "load_balancer",
            Self::Volume => "volume",
            Self::App => "app",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_tag_parses() {
        assert_eq!("digitalocean".parse(), Ok(ProviderKind::DigitalOcean));
        assert!("gcp".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn primary_set() {
        let primary: Vec<_> = ["project", "droplet", "vpc", "dns_zone", "database"]
            .iter()
            .filter_map(|p| ResourceKind::from_primitive(p))
            .filter(|k| k.is_primary())
            .collect();
        assert_eq!(primary.len(), 5);

        for secondary in ["firewall", "load_balancer", "volume", "app"] {
            let kind = ResourceKind::from_primitive(secondary).unwrap();
            assert!(!kind.is_primary(), "{secondary}");
        }
        assert_eq!(ResourceKind::from_primitive("size"), None);
    }
}
