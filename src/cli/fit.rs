//! `fit` subcommand: raw survey file to training table and artifacts

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use super::FitArgs;
use crate::pipeline::{load_raw_corpus, save_training_table, FieldRegistry, Pipeline, PipelineConfig};
use crate::report::{export_fit_report, ExportParams, FitSummary};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    print_warning, FitConfigView,
};

pub fn run_fit(args: &FitArgs, registry: Arc<FieldRegistry>) -> Result<()> {
    let output_path = args.output_path();
    let artifacts_dir = args.artifacts_dir();
    let encoding = args.encoding.to_string();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&FitConfigView {
        input: &args.input,
        output: &output_path,
        artifacts: &artifacts_dir,
        targets: &args.targets,
        encoding: &encoding,
        missing_threshold: args.missing_threshold,
        registry_version: registry.version(),
    });

    let config = PipelineConfig {
        targets: args.targets.clone(),
        encoding: args.encoding,
        unknown_value: args.unknown_value,
        missing_threshold: args.missing_threshold,
    };
    let pipeline = Pipeline::new(Arc::clone(&registry), config)?;

    // Step 1: Load
    print_step_header(1, "Loading Survey Records");
    let step_start = Instant::now();
    let spinner = create_spinner("Reading records...");
    let corpus = load_raw_corpus(&args.input, &registry)?;
    finish_with_success(
        &spinner,
        &format!("Loaded {} rows x {} columns", corpus.len(), corpus.columns.len()),
    );
    print_step_time(step_start.elapsed());

    // Step 2: Fit
    print_step_header(2, "Normalizing, Encoding and Aligning");
    let step_start = Instant::now();
    let spinner = create_spinner("Fitting encoder and schema...");
    let (fitted, output) = pipeline.fit_transform(&corpus)?;
    let report = &output.report;
    if report.malformed_values + report.out_of_domain_values > 0 {
        finish_with_warning(
            &spinner,
            &format!(
                "Fitted with {} malformed and {} out-of-range value(s) treated as missing",
                report.malformed_values, report.out_of_domain_values
            ),
        );
    } else {
        finish_with_success(&spinner, "Encoder and schema fitted");
    }
    print_count("rows kept for training", report.kept_rows, None);
    print_count("feature columns", report.feature_columns, None);
    if !report.unregistered_columns.is_empty() {
        print_warning(&format!(
            "Ignored {} unregistered column(s): {}",
            report.unregistered_columns.len(),
            report.unregistered_columns.join(", ")
        ));
    }
    if !report.dropped_fields.is_empty() {
        print_info(&format!(
            "Dropped {} field(s) above the missing threshold",
            report.dropped_fields.len()
        ));
    }
    print_step_time(step_start.elapsed());

    // Step 3: Save
    print_step_header(3, "Saving Results");
    let step_start = Instant::now();
    let spinner = create_spinner("Writing training table...");
    save_training_table(&output.table, &output_path)?;
    finish_with_success(&spinner, &format!("Training table saved to {}", output_path.display()));

    fitted.save_artifacts(&artifacts_dir).with_context(|| {
        format!("Failed to write artifacts to {}", artifacts_dir.display())
    })?;
    print_success(&format!("Artifacts saved to {}", artifacts_dir.display()));

    if !args.no_report {
        let report_path = args.report_path();
        let input_file = args.input.display().to_string();
        export_fit_report(
            report,
            &report_path,
            &ExportParams {
                input_file: &input_file,
                registry_version: registry.version(),
                registry_fingerprint: registry.fingerprint(),
                missing_threshold: args.missing_threshold,
            },
        )?;
        print_success(&format!("Fit report saved to {}", report_path.display()));
    }
    print_step_time(step_start.elapsed());

    FitSummary::new(report).display();
    print_completion("Fit complete!");

    Ok(())
}
