//! # gwdoc_core
//!
//! Injects API Gateway models and documentation into a deployment template,
//! then publishes the documentation to the remote gateway once the template
//! has been applied.
//!
//! The work is split into two explicit phases (see [`pipeline`]):
//!
//! - **pre-apply**: [`models::compile`] and [`merger::merge`] mutate the
//!   in-memory [`template::Template`];
//! - **post-apply**: [`documentation::compile_paths`] and
//!   [`publisher::Publisher`] reconcile the remote documentation state.

pub mod auto_version;
pub mod config;
pub mod documentation;
pub mod merger;
pub mod models;
pub mod naming;
pub mod pipeline;
pub mod publisher;
pub mod remote;
pub mod template;

pub use config::{ConfigError, DocumentationConfig, ModelDescription, ServiceDefinition};
pub use documentation::{DocumentationPart, Location, PartType};
pub use naming::{DefaultNaming, Naming};
pub use pipeline::{DocumentationPipeline, PipelineError, PostApplyOutcome, RunOptions};
pub use publisher::{PublishError, PublishReport, Publisher};
pub use remote::{RemoteError, RemoteRequest};
pub use template::{Template, TemplateError};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
