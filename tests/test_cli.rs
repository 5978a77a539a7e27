//! Tests for CLI argument parsing and the binary

mod common;

use assert_cmd::Command;
use clap::Parser;
use common::*;
use predicates::prelude::*;
use std::path::PathBuf;
use surveyprep::cli::{Cli, Commands};
use surveyprep::pipeline::CategoricalEncoding;

fn fit_args(args: &[&str]) -> surveyprep::cli::FitArgs {
    let mut argv = vec!["surveyprep", "fit"];
    argv.extend_from_slice(args);
    match Cli::parse_from(argv).command {
        Commands::Fit(fit) => fit,
        other => panic!("expected fit, got {:?}", other),
    }
}

#[test]
fn test_fit_default_values() {
    let args = fit_args(&["-i", "data.csv"]);

    assert!(args.targets.is_empty(), "Default targets should be every outcome");
    assert_eq!(args.encoding, CategoricalEncoding::Ordinal);
    assert_eq!(args.unknown_value, -1.0);
    assert_eq!(args.missing_threshold, None);
    assert!(!args.no_report);
}

#[test]
fn test_fit_custom_values() {
    let args = fit_args(&[
        "-i",
        "data.csv",
        "-t",
        "DIABETE3,CVDSTRK3",
        "--encoding",
        "one-hot",
        "--missing-threshold",
        "0.4",
        "--unknown-value",
        "-9",
        "--no-report",
    ]);

    assert_eq!(args.targets, vec!["DIABETE3".to_string(), "CVDSTRK3".to_string()]);
    assert_eq!(args.encoding, CategoricalEncoding::OneHot);
    assert_eq!(args.missing_threshold, Some(0.4));
    assert_eq!(args.unknown_value, -9.0);
    assert!(args.no_report);
}

#[test]
fn test_fit_path_derivation() {
    let args = fit_args(&["-i", "/data/brfss.parquet"]);
    assert_eq!(args.output_path(), PathBuf::from("/data/brfss_canonical.parquet"));
    assert_eq!(args.artifacts_dir(), PathBuf::from("/data/brfss_artifacts"));
    assert_eq!(args.report_path(), PathBuf::from("/data/brfss_fit_report.json"));

    let args = fit_args(&["-i", "/data/brfss.csv", "-o", "/out/train.csv", "--artifacts", "/out/art"]);
    assert_eq!(args.output_path(), PathBuf::from("/out/train.csv"));
    assert_eq!(args.artifacts_dir(), PathBuf::from("/out/art"));
}

#[test]
fn test_fit_rejects_bad_threshold() {
    let result = Cli::try_parse_from(["surveyprep", "fit", "-i", "data.csv", "--missing-threshold", "1.5"]);
    assert!(result.is_err());
    let result = Cli::try_parse_from(["surveyprep", "fit", "-i", "data.csv", "--encoding", "binary"]);
    assert!(result.is_err());
}

#[test]
fn test_transform_assignments() {
    let cli = Cli::parse_from([
        "surveyprep",
        "transform",
        "-a",
        "art",
        "--set",
        "SEX=2",
        "--set",
        "ALCDAY5=205",
    ]);
    let Commands::Transform(args) = cli.command else {
        panic!("expected transform");
    };
    assert_eq!(
        args.set,
        vec![("SEX".to_string(), "2".to_string()), ("ALCDAY5".to_string(), "205".to_string())]
    );
    assert_eq!(args.output_path(), None);
}

#[test]
fn test_transform_set_conflicts_with_input() {
    let result = Cli::try_parse_from(["surveyprep", "transform", "-a", "art", "-i", "x.csv", "--set", "SEX=1"]);
    assert!(result.is_err());
}

#[test]
fn test_global_rules_flag() {
    let cli = Cli::parse_from(["surveyprep", "rules", "--rules", "custom.json", "--field", "SEX"]);
    assert_eq!(cli.rules, Some(PathBuf::from("custom.json")));
}

#[test]
fn test_binary_rules_field() {
    Command::cargo_bin("surveyprep")
        .unwrap()
        .args(["rules", "--field", "CHECKUP1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Never"));
}

#[test]
fn test_binary_transform_without_artifacts_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    Command::cargo_bin("surveyprep")
        .unwrap()
        .args(["transform", "--set", "SEX=1", "-a"])
        .arg(dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("encoder_state.json"));
}

#[test]
fn test_binary_fit_then_transform() {
    let mut df = create_brfss_dataframe();
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let artifacts = temp_dir.path().join("artifacts");

    Command::cargo_bin("surveyprep")
        .unwrap()
        .args(["fit", "-t", "DIABETE3", "-i"])
        .arg(&csv_path)
        .arg("--artifacts")
        .arg(&artifacts)
        .assert()
        .success();

    assert!(temp_dir.path().join("survey_canonical.csv").exists());
    assert!(temp_dir.path().join("survey_fit_report.json").exists());
    assert!(artifacts.join("feature_schema.json").exists());

    let output = Command::cargo_bin("surveyprep")
        .unwrap()
        .args(["transform", "--set", "SEX=2", "--set", "ALCDAY5=205", "-a"])
        .arg(&artifacts)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let columns = json["columns"].as_array().unwrap();
    let values = json["values"].as_array().unwrap();
    assert_eq!(columns.len(), 5);
    assert_eq!(values.len(), 5);
    assert_eq!(columns[2], "ALCDAY5");
    assert_eq!(values[2], 5.0);
}

#[test]
fn test_binary_fit_without_targets() {
    let mut df = create_brfss_dataframe();
    let (temp_dir, csv_path) = create_temp_csv(&mut df);

    Command::cargo_bin("surveyprep")
        .unwrap()
        .args(["fit", "--no-report", "-i"])
        .arg(&csv_path)
        .assert()
        .success();

    let table = std::fs::read_to_string(temp_dir.path().join("survey_canonical.csv")).unwrap();
    let header = table.lines().next().unwrap();
    assert!(header.starts_with("DIABETE3,"), "unexpected header: {}", header);
    assert!(!header.contains("BPHIGH4"));
    assert_eq!(table.lines().count(), 7);
    assert!(temp_dir.path().join("survey_artifacts").join("encoder_state.json").exists());
}
