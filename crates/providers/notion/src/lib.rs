//! Project page publishing over the Notion API.
//!
//! Every failure is reported as a [`PageOutcome`]; this adapter never returns
//! an error to its caller.

use async_trait::async_trait;
use projdev_core::{NotionCredentials, NotionSettings, PageOutcome, PagePublisher};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

const PAGES_PATH: &str = "/v1/pages";
const IDEA_HEADING: &str = "Project Idea";

/// Request body for a new page in `database_id`.
pub fn page_body(
    database_id: &str,
    initial_status: &str,
    idea: &str,
    project_name: &str,
    github_url: &str,
) -> serde_json::Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Name": {
                "title": [{ "text": { "content": project_name } }]
            },
            "Status": {
                "select": { "name": initial_status }
            },
            "GitHub": {
                "url": github_url
            }
        },
        "children": [
            {
                "object": "block",
                "type": "heading_2",
                "heading_2": {
                    "rich_text": [{ "type": "text", "text": { "content": IDEA_HEADING } }]
                }
            },
            {
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": [{ "type": "text", "text": { "content": idea } }]
                }
            }
        ]
    })
}

#[derive(Clone)]
pub struct NotionPublisher {
    http: reqwest::Client,
    endpoint: String,
    version: String,
    initial_status: String,
    credentials: Option<NotionCredentials>,
}

impl NotionPublisher {
    pub fn new(http: reqwest::Client, settings: &NotionSettings) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", settings.api_base.trim_end_matches('/'), PAGES_PATH),
            version: settings.version.clone(),
            initial_status: settings.initial_status.clone(),
            credentials: settings.credentials(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

#[async_trait]
impl PagePublisher for NotionPublisher {
    async fn publish(&self, idea: &str, project_name: &str, github_url: &str) -> PageOutcome {
        let Some(credentials) = &self.credentials else {
            debug!("notion credentials absent; page skipped");
            return PageOutcome::NotConfigured;
        };
        let body = page_body(
            &credentials.database_id,
            &self.initial_status,
            idea,
            project_name,
            github_url,
        );
        let response = match self
            .http
            .post(&self.endpoint)
            .bearer_auth(credentials.api_key.expose_secret())
            .header("Notion-Version", &self.version)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "notion request failed");
                return PageOutcome::Failed {
                    status: None,
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), project = %project_name, "notion rejected page");
            return PageOutcome::Failed {
                status: Some(status.as_u16()),
                message,
            };
        }

        match response.json::<CreatedPage>().await {
            Ok(CreatedPage { url: Some(url) }) => {
                info!(project = %project_name, url = %url, "notion page created");
                PageOutcome::Created { url }
            }
            Ok(CreatedPage { url: None }) => PageOutcome::Failed {
                status: None,
                message: "response missing page url".to_string(),
            },
            Err(e) => PageOutcome::Failed {
                status: None,
                message: format!("malformed response: {e}"),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    #[serde(default)]
    url: Option<String>,
}
