use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gwdoc", about = "API Gateway documentation and models for deployment templates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge models and method wiring into a compiled template.
    Prepare {
        #[command(flatten)]
        config: ConfigArgs,

        /// Compiled template (JSON).
        #[arg(long)]
        template: PathBuf,

        /// Where to write the merged template. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the compiled documentation parts as JSON.
    Parts {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Publish documentation to the deployed API.
    Publish {
        #[command(flatten)]
        service: ServiceArgs,

        /// Compile and log parts without publishing.
        #[arg(long)]
        dry_run: bool,

        /// Remote bridge endpoint that forwards provider requests.
        #[arg(long, env = "GWDOC_BRIDGE_URL")]
        bridge_url: Option<String>,

        /// Part calls in flight during reconciliation.
        #[arg(long, default_value_t = gwdoc_core::publisher::DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Exit non-zero when any documentation part failed to reconcile.
        #[arg(long)]
        fail_on_part_errors: bool,
    },

    /// Print the version.
    Version,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Service definition (YAML, or JSON with a `.json` extension).
    #[arg(long, short = 'c', default_value = "serverless.yml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Overrides `provider.stage`.
    #[arg(long, short = 's')]
    pub stage: Option<String>,

    /// Overrides `provider.region`.
    #[arg(long, short = 'r')]
    pub region: Option<String>,
}
