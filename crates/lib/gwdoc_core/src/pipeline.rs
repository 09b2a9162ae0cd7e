//! Two-phase pipeline invoked by the deployment orchestrator.
//!
//! - [`DocumentationPipeline::pre_apply`] runs before the template is
//!   applied: models and method wiring are merged into the template.
//! - [`DocumentationPipeline::post_apply`] runs after the template has been
//!   applied successfully: documentation parts are published.
//!
//! A service without a documentation block passes through both phases
//! untouched.

use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::auto_version;
use crate::config::{ConfigError, ServiceDefinition};
use crate::documentation::{DocumentationPart, compile_service};
use crate::merger::{self, MergeReport};
use crate::models;
use crate::naming::Naming;
use crate::publisher::{API_ID_OUTPUT_KEY, DEFAULT_CONCURRENCY, PublishError, PublishReport, Publisher};
use crate::remote::RemoteRequest;
use crate::template::{REST_API_LOGICAL_ID, Template, TemplateError};

/// Errors from either phase.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Per-run options supplied by the orchestrator.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Overrides `provider.stage`.
    pub stage: Option<String>,
    /// Overrides `provider.region`.
    pub region: Option<String>,
    /// Compile parts without publishing them.
    pub dry_run: bool,
    /// Part calls in flight during reconciliation.
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stage: None,
            region: None,
            dry_run: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// The deployed stack the post-apply phase works against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackInfo {
    pub stack_name: String,
    pub stage: String,
    pub region: String,
}

/// What the post-apply phase did.
#[derive(Debug, Clone, PartialEq)]
pub enum PostApplyOutcome {
    /// No documentation block or no version to publish.
    NotConfigured,
    DryRun {
        api_id: String,
        version: String,
        parts: Vec<DocumentationPart>,
    },
    Published(PublishReport),
}

pub struct DocumentationPipeline<N> {
    naming: N,
    options: RunOptions,
}

impl<N: Naming> DocumentationPipeline<N> {
    pub fn new(naming: N, options: RunOptions) -> Self {
        Self { naming, options }
    }

    /// Stack coordinates for `service` under the current options.
    pub fn stack_info(&self, service: &ServiceDefinition) -> StackInfo {
        let stage = self
            .options
            .stage
            .clone()
            .unwrap_or_else(|| service.provider.stage.clone());
        let region = self
            .options
            .region
            .clone()
            .unwrap_or_else(|| service.provider.region.clone());
        StackInfo {
            stack_name: self.naming.stack_name(&stage),
            stage,
            region,
        }
    }

    /// Merge models and endpoint documentation into `template`.
    pub fn pre_apply(
        &self,
        template: &mut Template,
        service: &ServiceDefinition,
    ) -> Result<MergeReport, PipelineError> {
        let Some(documentation) = service.documentation() else {
            return Ok(MergeReport::default());
        };
        documentation.validate()?;

        template.insert_output(
            API_ID_OUTPUT_KEY,
            json!({
                "Description": "API ID",
                "Value": { "Ref": REST_API_LOGICAL_ID },
            }),
        );

        let compiled = models::compile_all(&documentation.models);
        let endpoints = service.documented_endpoints();
        let report = merger::merge(
            template,
            &compiled,
            endpoints.iter().map(|(_, endpoint)| *endpoint),
            &self.naming,
        );
        info!(
            models = report.models.len(),
            methods = report.methods.len(),
            skipped = report.skipped.len(),
            "documentation merged into template"
        );
        Ok(report)
    }

    /// Publish the service's documentation to the deployed API.
    pub async fn post_apply(
        &self,
        stack: &StackInfo,
        service: &ServiceDefinition,
        remote: &dyn RemoteRequest,
    ) -> Result<PostApplyOutcome, PipelineError> {
        let Some(documentation) = service.documentation() else {
            return Ok(PostApplyOutcome::NotConfigured);
        };
        let Some(version) = auto_version::resolve(service)? else {
            info!("no documentation version declared, skipping publish");
            return Ok(PostApplyOutcome::NotConfigured);
        };

        let mut publisher = Publisher::new(remote, stack.stage.as_str(), stack.region.as_str())
            .with_version_stage(documentation.stage.clone())
            .with_concurrency(self.options.concurrency);
        let api_id = publisher.resolve_api_id(&stack.stack_name).await?;
        let parts = compile_service(service);

        if self.options.dry_run {
            info!(api_id = %api_id, version = %version, parts = parts.len(), "dry run, not publishing");
            return Ok(PostApplyOutcome::DryRun {
                api_id,
                version,
                parts,
            });
        }

        let report = publisher
            .publish(&api_id, &parts, &version, documentation.description.as_deref())
            .await?;
        info!(
            api_id = %report.api_id,
            version = %report.version,
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failures.len(),
            "documentation published"
        );
        Ok(PostApplyOutcome::Published(report))
    }
}
