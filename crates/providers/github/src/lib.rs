//! Repository provisioning over the GitHub REST API.
//!
//! Creates a public, auto-initialised repository for the authenticated user,
//! then writes the expanded specification to `README.md` in a single commit.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use projdev_core::{ExpandedSpec, GithubSettings, RepositoryHandle, RepositoryProvisioner};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const README_PATH: &str = "README.md";
pub const COMMIT_MESSAGE: &str = "Initial project specification";

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("GITHUB_TOKEN is not set")]
    MissingToken,
    #[error("transport: {0}")]
    Transport(String),
    #[error("github returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode: {0}")]
    Decode(String),
}

impl ProvisionError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProvisionError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct GithubProvisioner {
    http: reqwest::Client,
    api_base: String,
    token: Option<SecretString>,
    user_agent: String,
}

impl GithubProvisioner {
    pub fn new(http: reqwest::Client, settings: &GithubSettings) -> Self {
        Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            user_agent: settings.user_agent.clone(),
        }
    }

    fn authed(&self, builder: RequestBuilder, token: &SecretString) -> RequestBuilder {
        builder
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn contents_url(&self, full_name: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_base, full_name, README_PATH)
    }

    async fn create_repo(
        &self,
        token: &SecretString,
        name: &str,
        description: &str,
    ) -> Result<RepositoryHandle, ProvisionError> {
        let body = CreateRepoRequest {
            name,
            description,
            private: false,
            auto_init: true,
        };
        let response = self
            .authed(self.http.post(format!("{}/user/repos", self.api_base)), token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProvisionError::Transport(e.to_string()))?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProvisionError::Decode(e.to_string()))
    }

    /// Blob sha of the README that `auto_init` generated, if there is one.
    async fn existing_readme_sha(
        &self,
        token: &SecretString,
        repository: &RepositoryHandle,
    ) -> Result<Option<String>, ProvisionError> {
        let mut request = self.http.get(self.contents_url(&repository.full_name));
        if let Some(branch) = &repository.default_branch {
            request = request.query(&[("ref", branch)]);
        }
        let response = self
            .authed(request, token)
            .send()
            .await
            .map_err(|e| ProvisionError::Transport(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let file: ContentFile = response
            .json()
            .await
            .map_err(|e| ProvisionError::Decode(e.to_string()))?;
        Ok(Some(file.sha))
    }

    async fn write_readme(
        &self,
        token: &SecretString,
        repository: &RepositoryHandle,
        readme: &ExpandedSpec,
        sha: Option<String>,
    ) -> Result<(), ProvisionError> {
        let body = PutContentRequest {
            message: COMMIT_MESSAGE,
            content: STANDARD.encode(readme.as_str()),
            sha,
            branch: repository.default_branch.as_deref(),
        };
        let response = self
            .authed(self.http.put(self.contents_url(&repository.full_name)), token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProvisionError::Transport(e.to_string()))?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RepositoryProvisioner for GithubProvisioner {
    type Error = ProvisionError;

    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        readme: &ExpandedSpec,
    ) -> Result<RepositoryHandle, ProvisionError> {
        let token = self.token.as_ref().ok_or(ProvisionError::MissingToken)?;
        let repository = self
            .create_repo(token, name, description)
            .await
            .inspect_err(|e| {
                warn!(status = ?e.status(), repo = %name, "repository creation failed");
            })?;
        info!(repo = %repository.full_name, url = %repository.html_url, "repository created");

        let sha = self.existing_readme_sha(token, &repository).await?;
        debug!(repo = %repository.full_name, replacing = sha.is_some(), "writing README");
        self.write_readme(token, &repository, readme, sha).await?;
        Ok(repository)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProvisionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProvisionError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Debug, Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    sha: String,
}
