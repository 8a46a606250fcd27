//! Process-wide settings, built once at startup and handed to each provider.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::errors::ConfigError;

pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_NOTION_API_KEY: &str = "NOTION_API_KEY";
pub const ENV_NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const ENV_PORT: &str = "PORT";

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_INITIAL_STATUS: &str = "Idea";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub anthropic: AnthropicSettings,
    pub github: GithubSettings,
    pub notion: NotionSettings,
    pub serve: ServeSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub token: Option<SecretString>,
    pub api_base: String,
    pub user_agent: String,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            user_agent: format!("projdev/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    pub api_key: Option<SecretString>,
    pub database_id: Option<String>,
    pub api_base: String,
    pub version: String,
    pub initial_status: String,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            database_id: None,
            api_base: DEFAULT_NOTION_API_BASE.to_string(),
            version: DEFAULT_NOTION_VERSION.to_string(),
            initial_status: DEFAULT_INITIAL_STATUS.to_string(),
        }
    }
}

/// Both halves of the workspace credentials; present only when neither is blank.
#[derive(Clone, Debug)]
pub struct NotionCredentials {
    pub api_key: SecretString,
    pub database_id: String,
}

impl NotionSettings {
    pub fn credentials(&self) -> Option<NotionCredentials> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())?;
        let database_id = self
            .database_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())?;
        Some(NotionCredentials {
            api_key: api_key.clone(),
            database_id: database_id.to_string(),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServeSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Settings {
    /// Defaults overlaid with the well-known process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        settings.apply_lookup(lookup)?;
        Ok(settings)
    }

    /// Overlay the well-known variables (`ANTHROPIC_API_KEY`, `GITHUB_TOKEN`,
    /// `NOTION_API_KEY`, `NOTION_DATABASE_ID`, `PORT`) resolved through
    /// `lookup`. Blank values are ignored.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(key) = get(ENV_ANTHROPIC_API_KEY) {
            self.anthropic.api_key = Some(SecretString::new(key));
        }
        if let Some(token) = get(ENV_GITHUB_TOKEN) {
            self.github.token = Some(SecretString::new(token));
        }
        if let Some(key) = get(ENV_NOTION_API_KEY) {
            self.notion.api_key = Some(SecretString::new(key));
        }
        if let Some(id) = get(ENV_NOTION_DATABASE_ID) {
            self.notion.database_id = Some(id);
        }
        if let Some(raw) = get(ENV_PORT) {
            self.serve.port = raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidPort {
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}
