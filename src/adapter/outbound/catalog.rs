//! HTTP package catalog client.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::domain::{InputSchema, PackageDetails, StepKind};
use crate::error::{Error, Result};
use crate::port::PackageCatalog;

/// Default catalog API root.
pub const API_URL: &str = "https://api.tofuhub.co/functions/v1";

/// Package catalog reached over HTTP. An empty token sends no
/// `Authorization` header.
pub struct HttpCatalog {
    http: HttpClient,
    base_url: String,
    token: String,
}

impl HttpCatalog {
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// `<base>/packages/<name>`, with the package name percent-encoded.
    fn package_url(&self, package: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| lookup_error(package, "catalog URL cannot be a base"))?
            .pop_if_empty()
            .push("packages")
            .push(package);
        Ok(url)
    }
}

fn lookup_error(package: &str, reason: impl Into<String>) -> Error {
    Error::Lookup {
        target: package.to_owned(),
        reason: reason.into(),
    }
}

#[derive(Debug, Deserialize)]
struct PackageResponse {
    #[serde(default)]
    name: String,
    package_types: PackageType,
    versions: PackageVersion,
}

#[derive(Debug, Deserialize)]
struct PackageType {
    name: StepKind,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    configuration: Configuration,
}

#[derive(Debug, Default, Deserialize)]
struct Configuration {
    #[serde(default)]
    inputs: InputSchema,
}

impl From<PackageResponse> for PackageDetails {
    fn from(response: PackageResponse) -> Self {
        Self {
            name: response.name,
            kind: response.package_types.name,
            repository: response.versions.repository,
            inputs: response.versions.configuration.inputs,
        }
    }
}

#[async_trait]
impl PackageCatalog for HttpCatalog {
    async fn fetch(&self, package: &str) -> Result<PackageDetails> {
        let url = self.package_url(package)?;
        debug!(package = %package, url = %url, "fetching package");

        let mut request = self.http.get(url).header(ACCEPT, "application/json");
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| lookup_error(package, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| lookup_error(package, e.to_string()))?;

        if !status.is_success() {
            return Err(lookup_error(
                package,
                format!("HTTP {}: {body}", status.as_u16()),
            ));
        }

        let parsed: PackageResponse = serde_json::from_str(&body)
            .map_err(|e| lookup_error(package, format!("failed to parse JSON: {e}")))?;
        Ok(parsed.into())
    }
}
