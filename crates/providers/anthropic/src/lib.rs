//! Idea expansion over the Anthropic Messages API.
//!
//! One request per idea, no retries. Whatever text the first content block
//! carries becomes the README verbatim.

use async_trait::async_trait;
use projdev_core::{AnthropicSettings, ExpandedSpec, IdeaExpander};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
    #[error("transport: {0}")]
    Transport(String),
    #[error("anthropic returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode: {0}")]
    Decode(String),
    #[error("anthropic response contained no text block")]
    EmptyCompletion,
}

pub fn build_prompt(idea: &str) -> String {
    format!(
        "You are a product development expert. Take this idea and develop it into a detailed project specification:

Idea: {idea}

Please provide:
1. Project Overview (2-3 sentences)
2. Key Features (bullet points)
3. Technical Architecture (brief description)
4. Implementation Phases (3-5 phases)
5. Success Metrics

Format this as a well-structured markdown document suitable for a README.md"
    )
}

#[derive(Clone)]
pub struct AnthropicExpander {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    max_tokens: u32,
}

impl AnthropicExpander {
    pub fn new(http: reqwest::Client, settings: &AnthropicSettings) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", settings.base_url.trim_end_matches('/'), MESSAGES_PATH),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        }
    }
}

#[async_trait]
impl IdeaExpander for AnthropicExpander {
    type Error = ExpandError;

    async fn expand(&self, idea: &str) -> Result<ExpandedSpec, ExpandError> {
        let api_key = self.api_key.as_ref().ok_or(ExpandError::MissingApiKey)?;
        debug!(
            provider = "anthropic",
            model = %self.model,
            max_tokens = self.max_tokens,
            "requesting idea expansion"
        );
        let prompt = build_prompt(idea);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExpandError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExpandError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ExpandError::Decode(e.to_string()))?;
        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(ExpandError::EmptyCompletion)?;
        if let Some(usage) = parsed.usage {
            debug!(
                provider = "anthropic",
                tokens_input = usage.input_tokens,
                tokens_output = usage.output_tokens,
                "idea expansion completed"
            );
        }
        Ok(ExpandedSpec::new(text))
    }
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
