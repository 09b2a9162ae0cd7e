// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::path::Path;

use clap::Parser;
use cli::{Cli, Commands, ConfigArgs, ServiceArgs};
use gwdoc_core::documentation::compile_service;
use gwdoc_core::publisher::PublishReport;
use gwdoc_core::{
    DefaultNaming, DocumentationPipeline, PostApplyOutcome, RunOptions, ServiceDefinition,
    Template,
};

mod bridge;
mod cli;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let _logger = logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Prepare {
            config,
            template,
            out,
        } => prepare(&config, &template, out.as_deref())?,
        Commands::Parts { config } => {
            let definition = load_service(&config.config)?;
            let parts = compile_service(&definition);
            println!("{}", serde_json::to_string_pretty(&parts)?);
        }
        Commands::Publish {
            service,
            dry_run,
            bridge_url,
            concurrency,
            fail_on_part_errors,
        } => {
            publish(
                service,
                dry_run,
                bridge_url,
                concurrency,
                fail_on_part_errors,
            )
            .await?
        }
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load_service(path: &Path) -> Result<ServiceDefinition> {
    log::debug!("loading service definition from {}", path.display());
    Ok(ServiceDefinition::from_path(path)?)
}

fn pipeline(definition: &ServiceDefinition, options: RunOptions) -> DocumentationPipeline<DefaultNaming> {
    DocumentationPipeline::new(DefaultNaming::new(definition.service.clone()), options)
}

fn prepare(args: &ConfigArgs, template_path: &Path, out: Option<&Path>) -> Result<()> {
    let definition = load_service(&args.config)?;
    let raw = std::fs::read_to_string(template_path)?;
    let mut template = Template::from_value(serde_json::from_str(&raw)?)?;

    let report =
        pipeline(&definition, RunOptions::default()).pre_apply(&mut template, &definition)?;
    for logical_id in &report.skipped {
        log::warn!("method {logical_id} not found in template, documentation not attached");
    }

    let rendered = serde_json::to_string_pretty(&template.into_value())?;
    match out {
        Some(path) => {
            std::fs::write(path, rendered + "\n")?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn publish(
    args: ServiceArgs,
    dry_run: bool,
    bridge_url: Option<String>,
    concurrency: usize,
    fail_on_part_errors: bool,
) -> Result<()> {
    let definition = load_service(&args.config.config)?;
    if definition.documentation().is_none() {
        log::info!("no custom.documentation block, nothing to publish");
        return Ok(());
    }
    let url = bridge_url.ok_or_else(|| {
        Error::Custom("a bridge URL is required (--bridge-url or GWDOC_BRIDGE_URL)".to_string())
    })?;
    if concurrency == 0 {
        return Err(Error::Custom("--concurrency must be at least 1".to_string()));
    }

    let options = RunOptions {
        stage: args.stage,
        region: args.region,
        dry_run,
        concurrency,
    };
    let pipeline = pipeline(&definition, options);
    let stack = pipeline.stack_info(&definition);
    log::info!(
        "publishing documentation for {} ({})",
        stack.stack_name,
        stack.region
    );

    let remote = bridge::HttpBridge::new(url);
    match pipeline.post_apply(&stack, &definition, &remote).await? {
        PostApplyOutcome::NotConfigured => {}
        PostApplyOutcome::DryRun { parts, .. } => {
            println!("{}", serde_json::to_string_pretty(&parts)?);
        }
        PostApplyOutcome::Published(report) => {
            warn_part_failures(&report);
            if fail_on_part_errors && !report.failures.is_empty() {
                return Err(Error::Custom(format!(
                    "{} documentation part(s) failed to reconcile",
                    report.failures.len()
                )));
            }
        }
    }
    Ok(())
}

/// Part failures do not fail the run; they are reported in one warning.
fn warn_part_failures(report: &PublishReport) {
    if report.failures.is_empty() {
        return;
    }
    let details: Vec<String> = report
        .failures
        .iter()
        .map(|failure| format!("{:?} {}: {}", failure.action, failure.location, failure.error))
        .collect();
    log::warn!(
        "{} documentation part(s) failed to reconcile, version {} published anyway: {}",
        report.failures.len(),
        report.version,
        details.join("; ")
    );
}
