use serde::{Deserialize, Serialize};

use crate::validate::{describe_idea, missing_sections};

/// Status marker carried by every successful report.
pub const STATUS_SUCCESS: &str = "success";

/// Section headings the expansion prompt asks for, in prompt order.
pub const SPEC_SECTIONS: [&str; 5] = [
    "Overview",
    "Key Features",
    "Technical Architecture",
    "Implementation Phases",
    "Success Metrics",
];

/// Wire text reported in `notion_url` when workspace credentials are absent.
pub const NOT_CONFIGURED_MESSAGE: &str = "Notion not configured";

const PAGE_FAILURE_PREFIX: &str = "Failed to create Notion page";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectRequest {
    pub idea: String,
    pub project_name: String,
    pub create_page: bool,
}

impl ProjectRequest {
    pub fn new(idea: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            project_name: project_name.into(),
            create_page: true,
        }
    }

    #[must_use]
    pub fn with_page(mut self, create_page: bool) -> Self {
        self.create_page = create_page;
        self
    }

    pub fn repository_description(&self) -> String {
        describe_idea(&self.idea)
    }
}

/// Markdown produced by the idea expander. Kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandedSpec(String);

impl ExpandedSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn missing_sections(&self) -> Vec<&'static str> {
        missing_sections(&self.0)
    }
}

/// Fields read back from the hosting provider's created-repository object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryHandle {
    pub html_url: String,
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Result of the optional tracking-page step.
///
/// The publisher never fails the invocation; every failure mode lands in one
/// of these variants instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    Created {
        url: String,
    },
    NotConfigured,
    Failed {
        #[serde(
            rename = "status_code",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        status: Option<u16>,
        message: String,
    },
    /// The caller turned the step off. Never rendered on the wire.
    Skipped,
}

impl PageOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            PageOutcome::Created { url } => Some(url),
            _ => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, PageOutcome::Created { .. })
    }

    /// Single-string rendering used by the `notion_url` field and the
    /// standalone page tool.
    pub fn legacy_text(&self) -> Option<String> {
        match self {
            PageOutcome::Created { url } => Some(url.clone()),
            PageOutcome::NotConfigured => Some(NOT_CONFIGURED_MESSAGE.to_string()),
            PageOutcome::Failed {
                status: Some(code), ..
            } => Some(format!("{PAGE_FAILURE_PREFIX}: {code}")),
            PageOutcome::Failed {
                status: None,
                message,
            } => Some(format!("{PAGE_FAILURE_PREFIX}: {message}")),
            PageOutcome::Skipped => None,
        }
    }
}

/// Combined output of one orchestration run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopReport {
    pub github_url: String,
    pub spec: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion: Option<PageOutcome>,
}

impl DevelopReport {
    pub fn new(repository: &RepositoryHandle, spec: ExpandedSpec, page: PageOutcome) -> Self {
        let (notion_url, notion) = match page {
            PageOutcome::Skipped => (None, None),
            other => (other.legacy_text(), Some(other)),
        };
        Self {
            github_url: repository.html_url.clone(),
            spec: spec.into_string(),
            status: STATUS_SUCCESS.to_string(),
            notion_url,
            notion,
        }
    }
}
