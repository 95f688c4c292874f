//! DigitalOcean provider client.
//!
//! Name-existence checks walk the paginated list endpoint of the resource
//! kind; key upload registers an SSH key on the account.

mod dto;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use self::dto::{collection, resource_name, ListPage, NewSshKey, SshKey, SshKeyEnvelope};
use crate::domain::{ProviderKind, ResourceKind};
use crate::error::{Error, Result};
use crate::port::ProviderClient;

/// DigitalOcean API root.
pub const API_URL: &str = "https://api.digitalocean.com/v2";

/// Items requested per list page.
const PER_PAGE: u32 = 200;

pub struct DigitalOcean {
    http: HttpClient,
    api_url: String,
}

impl DigitalOcean {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self::with_api_url(http, API_URL)
    }

    #[must_use]
    pub fn with_api_url(http: HttpClient, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Fetch every item of a list endpoint, following `links.pages.next`.
    async fn list(&self, path: &str, key: &str, token: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut url = format!("{}/{path}?per_page={PER_PAGE}", self.api_url);

        loop {
            let response = self.http.get(&url).bearer_auth(token).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Connection(format!(
                    "DigitalOcean API error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )));
            }

            let body: Value = response.json().await?;
            let page = ListPage::from_body(&body, key);
            items.extend(page.items);
            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(items)
    }

    /// Find an already registered key with the same public key material.
    async fn find_key(&self, public_key: &str, token: &str) -> Result<Option<SshKey>> {
        let keys = self.list("account/keys", "ssh_keys", token).await?;
        Ok(keys
            .into_iter()
            .filter_map(|item| serde_json::from_value::<SshKey>(item).ok())
            .find(|key| key.public_key.trim() == public_key.trim()))
    }
}

#[async_trait]
impl ProviderClient for DigitalOcean {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DigitalOcean
    }

    async fn exists(&self, kind: ResourceKind, name: &str, token: &str) -> Result<bool> {
        let key = collection(kind);
        let items = self.list(key, key, token).await?;
        let found = items
            .iter()
            .any(|item| resource_name(kind, item) == Some(name));
        debug!(kind = %kind, name = %name, found, "existence checked");
        Ok(found)
    }

    async fn upload_key(&self, name: &str, public_key: &str, token: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/account/keys", self.api_url))
            .bearer_auth(token)
            .json(&NewSshKey { name, public_key })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let envelope: SshKeyEnvelope = response.json().await?;
            info!(
                key_id = envelope.ssh_key.id,
                fingerprint = %envelope.ssh_key.fingerprint,
                "ssh key registered"
            );
            return Ok(envelope.ssh_key.id.to_string());
        }

        // The account rejects duplicate key material; reuse the registered key.
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            if let Some(existing) = self.find_key(public_key, token).await? {
                debug!(key_id = existing.id, "ssh key already registered");
                return Ok(existing.id.to_string());
            }
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Connection(format!(
            "DigitalOcean rejected ssh key ({}): {body}",
            status.as_u16()
        )))
    }
}
