//! Core domain model, validation, settings, and provider traits.
//! No IO within this crate; HTTP adapters live under `crates/providers`.

pub mod config;
pub mod errors;
pub mod model;
pub mod traits;
pub mod validate;

pub use crate::config::{
    AnthropicSettings, GithubSettings, NotionCredentials, NotionSettings, ServeSettings, Settings,
};
pub use crate::errors::{ConfigError, ValidationError};
pub use crate::model::{
    DevelopReport, ExpandedSpec, PageOutcome, ProjectRequest, RepositoryHandle,
    NOT_CONFIGURED_MESSAGE, SPEC_SECTIONS, STATUS_SUCCESS,
};
pub use crate::traits::{IdeaExpander, PagePublisher, RepositoryProvisioner};
pub use crate::validate::{describe_idea, missing_sections, validate_idea, validate_project_name};
