//! surveyprep: Survey Feature Preparation CLI Tool
//!
//! Fits an encoder and feature schema on a raw survey file, then transforms
//! new records into the same columns.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use surveyprep::cli::{self, Cli, Commands};
use surveyprep::pipeline::FieldRegistry;

fn main() -> Result<()> {
    // Diagnostics go to stderr so stdout stays machine-readable for `transform`
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surveyprep=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let registry = match &cli.rules {
        Some(path) => Arc::new(
            FieldRegistry::from_json_file(path)
                .with_context(|| format!("Failed to load rule table from {}", path.display()))?,
        ),
        None => FieldRegistry::standard(),
    };
    tracing::debug!(
        version = registry.version(),
        fingerprint = registry.fingerprint(),
        fields = registry.len(),
        "rule table ready"
    );

    match &cli.command {
        Commands::Fit(args) => cli::fit::run_fit(args, registry),
        Commands::Transform(args) => cli::transform::run_transform(args, registry),
        Commands::Rules(args) => cli::rules::run_rules(args, &registry),
    }
}
