//! Fit report export

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{ExclusionCount, FitReport, MarkerProfile, OutcomeSummary};

/// Metadata about the fit run
#[derive(Serialize)]
pub struct FitMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub surveyprep_version: String,
    pub input_file: String,
    pub registry_version: String,
    pub registry_fingerprint: String,
    pub targets: Vec<String>,
    pub encoding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_threshold: Option<f64>,
}

/// Summary counts of the fit
#[derive(Serialize)]
pub struct FitCounts {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub excluded_rows: usize,
    pub malformed_values: usize,
    pub out_of_domain_values: usize,
    pub feature_fields: usize,
    pub categorical_fields: usize,
    pub feature_columns: usize,
}

/// Marker profile entry with its ratio and drop status
#[derive(Serialize)]
pub struct FieldProfileEntry<'a> {
    #[serde(flatten)]
    pub profile: &'a MarkerProfile,
    pub missing_ratio: f64,
    pub dropped: bool,
}

#[derive(Serialize)]
pub struct FitReportExport<'a> {
    pub metadata: FitMetadata,
    pub summary: FitCounts,
    pub outcomes: &'a [OutcomeSummary],
    pub exclusions: &'a [ExclusionCount],
    pub unregistered_columns: &'a [String],
    pub fields: Vec<FieldProfileEntry<'a>>,
}

/// Parameters for the report metadata
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub registry_version: &'a str,
    pub registry_fingerprint: &'a str,
    pub missing_threshold: Option<f64>,
}

pub fn build_fit_report<'a>(report: &'a FitReport, params: &ExportParams) -> FitReportExport<'a> {
    FitReportExport {
        metadata: FitMetadata {
            timestamp: Utc::now().to_rfc3339(),
            surveyprep_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            registry_version: params.registry_version.to_string(),
            registry_fingerprint: params.registry_fingerprint.to_string(),
            targets: report.targets.clone(),
            encoding: report.encoding.to_string(),
            missing_threshold: params.missing_threshold,
        },
        summary: FitCounts {
            total_rows: report.total_rows,
            kept_rows: report.kept_rows,
            excluded_rows: report.excluded_rows,
            malformed_values: report.malformed_values,
            out_of_domain_values: report.out_of_domain_values,
            feature_fields: report.feature_fields,
            categorical_fields: report.categorical_fields,
            feature_columns: report.feature_columns,
        },
        outcomes: &report.outcomes,
        exclusions: &report.exclusions,
        unregistered_columns: &report.unregistered_columns,
        fields: report
            .marker_profile
            .iter()
            .map(|profile| FieldProfileEntry {
                profile,
                missing_ratio: profile.missing_ratio(),
                dropped: report.dropped_fields.contains(&profile.field),
            })
            .collect(),
    }
}

/// Write the fit report as pretty JSON.
pub fn export_fit_report(report: &FitReport, output_path: &Path, params: &ExportParams) -> Result<()> {
    let export = build_fit_report(report, params);

    let json = serde_json::to_string_pretty(&export).context("Failed to serialize fit report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write fit report to {}", output_path.display()))?;

    Ok(())
}
