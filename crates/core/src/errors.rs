use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("idea must not be empty")]
    EmptyIdea,
    #[error("project_name must not be empty")]
    EmptyProjectName,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port {value:?}: {reason}")]
    InvalidPort { value: String, reason: String },
}
