//! GitHub repository host.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::port::{CreatedRepository, RepositoryHost};

/// GitHub REST API root.
pub const API_URL: &str = "https://api.github.com";

const PER_PAGE: u32 = 100;
const AGENT: &str = "tofuhub-cli";

#[derive(Debug, Deserialize)]
struct RepositoryDto {
    name: String,
    #[serde(default)]
    clone_url: String,
    #[serde(default)]
    html_url: String,
}

impl From<RepositoryDto> for CreatedRepository {
    fn from(dto: RepositoryDto) -> Self {
        Self {
            name: dto.name,
            clone_url: dto.clone_url,
            html_url: dto.html_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewRepository<'a> {
    name: &'a str,
    private: bool,
}

/// Repositories of the authenticated user, or of `org` when set.
pub struct GitHub {
    http: HttpClient,
    api_url: String,
    token: String,
    org: Option<String>,
}

impl GitHub {
    #[must_use]
    pub fn new(http: HttpClient, token: impl Into<String>, org: Option<String>) -> Self {
        Self {
            http,
            api_url: API_URL.to_owned(),
            token: token.into(),
            org: org.filter(|o| !o.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn repos_url(&self) -> String {
        match &self.org {
            Some(org) => format!("{}/orgs/{org}/repos", self.api_url),
            None => format!("{}/user/repos", self.api_url),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(USER_AGENT, AGENT)
            .header(ACCEPT, "application/vnd.github+json")
    }
}

#[async_trait]
impl RepositoryHost for GitHub {
    async fn exists(&self, name: &str) -> Result<bool> {
        let url = self.repos_url();
        let mut page = 1u32;

        loop {
            let response = self
                .authorized(self.http.get(&url))
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Connection(format!(
                    "GitHub API error listing repositories: {}",
                    status.as_u16()
                )));
            }

            let repos: Vec<RepositoryDto> = response.json().await?;
            if repos.iter().any(|r| r.name == name) {
                return Ok(true);
            }
            if repos.len() < PER_PAGE as usize {
                debug!(name, pages = page, "repository name is free");
                return Ok(false);
            }
            page += 1;
        }
    }

    async fn create(&self, name: &str) -> Result<CreatedRepository> {
        let response = self
            .authorized(self.http.post(self.repos_url()))
            .json(&NewRepository {
                name,
                private: true,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "GitHub refused to create '{name}' ({}): {body}",
                status.as_u16()
            )));
        }

        let repo: CreatedRepository = response.json::<RepositoryDto>().await?.into();
        info!(name = %repo.name, url = %repo.html_url, "repository created");
        Ok(repo)
    }

    fn authenticated_url(&self, clone_url: &str) -> String {
        clone_url.replacen("https://", &format!("https://{}@", self.token), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repos_url_depends_on_org() {
        let user = GitHub::new(HttpClient::new(), "t", None);
        assert_eq!(user.repos_url(), "https://api.github.com/user/repos");

        let org = GitHub::new(HttpClient::new(), "t", Some("acme".into()))
            .with_api_url("http://localhost:1/");
        assert_eq!(org.repos_url(), "http://localhost:1/orgs/acme/repos");
    }

    #[test]
    fn blank_org_means_user() {
        let host = GitHub::new(HttpClient::new(), "t", Some("  ".into()));
        assert!(host.org.is_none());
    }

    #[test]
    fn authenticated_url_embeds_token() {
        let host = GitHub::new(HttpClient::new(), "ghp_x", None);
        assert_eq!(
            host.authenticated_url("https://github.com/me/stack.git"),
            "https://ghp_x@github.com/me/stack.git"
        );
    }
}
