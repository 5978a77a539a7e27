//! `transform` subcommand: apply fitted artifacts to new records

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;

use super::TransformArgs;
use crate::pipeline::{
    load_raw_corpus, read_record_json, save_feature_rows, FieldRegistry, FittedPipeline, RawRecord,
    TransformDiagnostics, Transformed,
};
use crate::utils::create_spinner;

/// JSON written to stdout for a single record.
#[derive(Serialize)]
pub struct VectorOutput<'a> {
    pub columns: Vec<&'a str>,
    pub values: &'a [f64],
    pub diagnostics: &'a TransformDiagnostics,
}

/// Build the single record from `--record` and `--set`, in that order.
pub fn assemble_record(args: &TransformArgs) -> Result<RawRecord> {
    let mut record = match &args.record {
        Some(path) => read_record_json(path)?,
        None => RawRecord::new(),
    };
    for (field, value) in &args.set {
        record.set(field, value);
    }
    Ok(record)
}

pub fn render_vector(fitted: &FittedPipeline, transformed: &Transformed) -> Result<String> {
    let output = VectorOutput {
        columns: fitted.schema().column_names().collect(),
        values: &transformed.vector,
        diagnostics: &transformed.diagnostics,
    };
    serde_json::to_string_pretty(&output).context("Failed to serialize feature vector")
}

pub fn run_transform(args: &TransformArgs, registry: Arc<FieldRegistry>) -> Result<()> {
    let fitted = FittedPipeline::load(registry, &args.artifacts)
        .with_context(|| format!("Cannot use artifacts in {}", args.artifacts.display()))?;

    match (&args.input, args.output_path()) {
        (Some(input), Some(output_path)) => {
            println!(
                "\n {} Transforming records with fitted artifacts",
                style("◆").cyan().bold()
            );
            println!("   Input:  {}", style(input.display()).dim());
            println!("   Output: {}", style(output_path.display()).dim());
            println!();

            let spinner = create_spinner("Reading records...");
            let corpus = load_raw_corpus(input, fitted.registry())?;
            spinner.finish_with_message(format!(
                "{} Loaded {} rows",
                style("✓").green(),
                corpus.len()
            ));

            let spinner = create_spinner("Transforming...");
            let rows = fitted.transform_batch(&corpus.rows);
            save_feature_rows(fitted.schema(), &rows, &output_path)?;
            spinner.finish_with_message(format!(
                "{} {} rows x {} columns written",
                style("✓").green(),
                rows.len(),
                fitted.schema().len()
            ));

            let unclean = rows.iter().filter(|r| !r.diagnostics.is_clean()).count();
            if unclean > 0 {
                println!(
                    "   {} {} row(s) had unseen labels or unreadable values",
                    style("!").yellow().bold(),
                    style(unclean).yellow()
                );
            }
            println!();
        }
        _ => {
            let record = assemble_record(args)?;
            let transformed = fitted.transform(&record);
            for unseen in &transformed.diagnostics.unseen {
                tracing::warn!(field = %unseen.field, label = %unseen.label, "label not seen during fit");
            }
            println!("{}", render_vector(&fitted, &transformed)?);
        }
    }

    Ok(())
}
