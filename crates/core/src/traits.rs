use async_trait::async_trait;

use crate::model::{ExpandedSpec, PageOutcome, RepositoryHandle};

/// Turns a short idea into a markdown specification.
#[async_trait]
pub trait IdeaExpander: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn expand(&self, idea: &str) -> Result<ExpandedSpec, Self::Error>;
}

/// Creates a remote repository and commits the specification as its README.
/// Not idempotent: a second call with the same name is expected to fail.
#[async_trait]
pub trait RepositoryProvisioner: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        readme: &ExpandedSpec,
    ) -> Result<RepositoryHandle, Self::Error>;
}

/// Mirrors a project into a tracking workspace. Infallible by contract:
/// failures are reported through [`PageOutcome`].
#[async_trait]
pub trait PagePublisher: Send + Sync {
    async fn publish(&self, idea: &str, project_name: &str, github_url: &str) -> PageOutcome;
}
