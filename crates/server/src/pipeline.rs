//! Sequential orchestration: expand the idea, provision the repository, then
//! optionally publish the tracking page.

use projdev_core::{
    validate_idea, validate_project_name, DevelopReport, IdeaExpander, PageOutcome,
    PagePublisher, ProjectRequest, RepositoryProvisioner, ValidationError,
};
use thiserror::Error;
use tracing::{info, warn, Instrument};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Expand(#[source] BoxError),
    #[error("{0}")]
    Provision(#[source] BoxError),
}

impl PipelineError {
    /// Stable code reported in JSON-RPC error data.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "E_VALIDATION",
            PipelineError::Expand(_) => "E_EXPAND",
            PipelineError::Provision(_) => "E_PROVISION",
        }
    }
}

pub struct Pipeline<E, R, P> {
    expander: E,
    provisioner: R,
    publisher: P,
}

impl<E, R, P> Pipeline<E, R, P>
where
    E: IdeaExpander,
    R: RepositoryProvisioner,
    P: PagePublisher,
{
    pub fn new(expander: E, provisioner: R, publisher: P) -> Self {
        Self {
            expander,
            provisioner,
            publisher,
        }
    }

    /// Run the whole chain once. Expansion and provisioning failures abort the
    /// run; the page step only ever reports its outcome. Nothing is rolled back.
    pub async fn develop(&self, request: &ProjectRequest) -> Result<DevelopReport, PipelineError> {
        validate_idea(&request.idea)?;
        validate_project_name(&request.project_name)?;
        let span = tracing::info_span!("pipeline.develop", project = %request.project_name);
        async move {
            info!("expanding idea");
            let spec = self
                .expander
                .expand(&request.idea)
                .await
                .map_err(|e| PipelineError::Expand(Box::new(e)))?;
            let missing = spec.missing_sections();
            if !missing.is_empty() {
                warn!(?missing, "expanded spec lacks requested sections; writing it unchanged");
            }

            info!("provisioning repository");
            let repository = self
                .provisioner
                .create_repository(
                    &request.project_name,
                    &request.repository_description(),
                    &spec,
                )
                .await
                .map_err(|e| PipelineError::Provision(Box::new(e)))?;

            let page = if request.create_page {
                info!("publishing project page");
                self.publisher
                    .publish(&request.idea, &request.project_name, &repository.html_url)
                    .await
            } else {
                PageOutcome::Skipped
            };
            if let PageOutcome::Failed { status, message } = &page {
                warn!(?status, %message, "project page failed; repository kept");
            }
            info!(
                github_url = %repository.html_url,
                page_created = page.is_created(),
                page_url = page.url().unwrap_or("-"),
                "pipeline completed"
            );
            Ok::<_, PipelineError>(DevelopReport::new(&repository, spec, page))
        }
        .instrument(span)
        .await
    }

    pub async fn publish_page(&self, idea: &str, project_name: &str, github_url: &str) -> PageOutcome {
        self.publisher.publish(idea, project_name, github_url).await
    }
}
