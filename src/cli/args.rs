//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::CategoricalEncoding;

/// surveyprep - Normalize coded survey records into a schema-stable feature table
#[derive(Parser, Debug)]
#[command(name = "surveyprep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Field rule table (JSON) to use instead of the built-in BRFSS 2015 table
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit encoder and schema on a raw survey file and write the training table
    Fit(FitArgs),

    /// Transform records with previously fitted artifacts
    Transform(TransformArgs),

    /// List or export the field rule table
    Rules(RulesArgs),
}

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Raw survey file (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Training table path (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_canonical' suffix (e.g., data.csv -> data_canonical.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the fitted encoder state and feature schema.
    /// Defaults to input directory with '_artifacts' suffix.
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Required outcome fields (comma-separated). Rows missing any of them are excluded.
    /// Default: every outcome field in the rule table that the input carries.
    #[arg(short, long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Categorical encoding: "ordinal" (default) or "one-hot"
    #[arg(long, default_value = "ordinal")]
    pub encoding: CategoricalEncoding,

    /// Drop feature fields whose missing ratio among kept rows exceeds this value (0.0 to 1.0).
    /// Disabled when not given.
    #[arg(long, value_parser = validate_missing_threshold)]
    pub missing_threshold: Option<f64>,

    /// Value written for "unknown" answers in numeric columns
    #[arg(long, default_value = "-1.0", allow_negative_numbers = true, value_parser = validate_unknown_value)]
    pub unknown_value: f64,

    /// Skip writing the JSON fit report
    #[arg(long, default_value = "false")]
    pub no_report: bool,
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Directory holding fitted artifacts
    #[arg(short, long)]
    pub artifacts: PathBuf,

    /// Single record as a JSON object file
    #[arg(long, conflicts_with = "input")]
    pub record: Option<PathBuf>,

    /// Single field assignment; repeatable. Applied on top of --record.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment, conflicts_with = "input")]
    pub set: Vec<(String, String)>,

    /// Raw survey file to transform row by row (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Feature table path for --input.
    /// Defaults to input directory with '_features' suffix.
    #[arg(short, long, requires = "input")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Show the full rule of a single field
    #[arg(long)]
    pub field: Option<String>,

    /// Write the rule table as JSON to this path
    #[arg(long)]
    pub export: Option<PathBuf>,
}

fn sibling(input: &Path, suffix: &str, extension: Option<&str>) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    match extension {
        Some(ext) => parent.join(format!("{}{}.{}", stem, suffix, ext)),
        None => parent.join(format!("{}{}", stem, suffix)),
    }
}

fn input_extension(input: &Path) -> &str {
    input.extension().and_then(|e| e.to_str()).unwrap_or("csv")
}

impl FitArgs {
    /// Training table path, derived from the input if not explicitly provided.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| sibling(&self.input, "_canonical", Some(input_extension(&self.input))))
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.artifacts
            .clone()
            .unwrap_or_else(|| sibling(&self.input, "_artifacts", None))
    }

    pub fn report_path(&self) -> PathBuf {
        sibling(&self.input, "_fit_report", Some("json"))
    }
}

impl TransformArgs {
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(
            self.output
                .clone()
                .unwrap_or_else(|| sibling(input, "_features", Some(input_extension(input)))),
        )
    }
}

/// Validator for missing_threshold parameter
fn validate_missing_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "missing_threshold must be between 0.0 and 1.0, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}

/// Validator for unknown_value parameter
fn validate_unknown_value(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("unknown_value must be finite, got {}", value))
    }
}

/// Parser for FIELD=VALUE assignments
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not in FIELD=VALUE form", s))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("'{}' has an empty field name", s));
    }
    Ok((field.to_string(), value.trim().to_string()))
}
