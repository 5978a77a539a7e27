//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use surveyprep::pipeline::{dataframe_to_corpus, FieldRegistry, RawCorpus, RawRecord};
use tempfile::TempDir;

/// Small BRFSS-style extract with known characteristics
///
/// - `DIABETE3`: rows 4 (code 7) and 6 (code 9) have no usable outcome
/// - `SEX`: row 7 is blank
/// - `ALCDAY5`: composite week/month codes plus 888 (none) and 777 (don't know)
/// - `_BMI5`: row 2 is blank
/// - `PHYSHLTH`: row 7 holds 45, outside the 1-30 range
/// - `SEQNO`: not in the rule table
pub fn create_brfss_dataframe() -> DataFrame {
    df! {
        "DIABETE3" => ["1", "3", "2", "4", "7", "3", "9", "3"],
        "SEX" => ["1", "2", "2", "1", "2", "1", "2", ""],
        "GENHLTH" => ["1", "3", "5", "2", "9", "3", "4", "2"],
        "ALCDAY5" => ["205", "888", "101", "777", "230", "", "202", "210"],
        "_BMI5" => ["2810", "3050", "", "2230", "2700", "3310", "2500", "2411"],
        "PHYSHLTH" => ["88", "15", "30", "77", "", "2", "88", "45"],
        "SEQNO" => ["1", "2", "3", "4", "5", "6", "7", "8"],
    }
    .unwrap()
}

pub fn brfss_corpus() -> RawCorpus {
    dataframe_to_corpus(&create_brfss_dataframe(), &FieldRegistry::standard()).unwrap()
}

pub fn standard() -> Arc<FieldRegistry> {
    FieldRegistry::standard()
}

/// Build a record from `(field, token)` pairs
pub fn record(pairs: &[(&str, &str)]) -> RawRecord {
    RawRecord::from_pairs(pairs.iter().copied())
}

/// Random BRFSS-style corpus drawn from a fixed seed
///
/// Codes include sentinels and occasional blanks so every marker shows up.
pub fn create_random_corpus(rows: usize, seed: u64) -> RawCorpus {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let columns: Vec<String> = ["DIABETE3", "SEX", "GENHLTH", "INCOME2", "ALCDAY5", "_BMI5", "PHYSHLTH"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let pick = |rng: &mut StdRng, choices: &[&str]| choices[rng.gen_range(0..choices.len())].to_string();

    let rows = (0..rows)
        .map(|_| {
            let values = vec![
                pick(&mut rng, &["1", "2", "3", "3", "4", "7"]),
                pick(&mut rng, &["1", "2"]),
                pick(&mut rng, &["1", "2", "3", "4", "5", "7", ""]),
                pick(&mut rng, &["1", "3", "5", "8", "77", "99"]),
                match rng.gen_range(0..4) {
                    0 => format!("{}", rng.gen_range(101..=107)),
                    1 => format!("{}", rng.gen_range(201..=230)),
                    2 => "888".to_string(),
                    _ => "777".to_string(),
                },
                if rng.gen_bool(0.1) {
                    String::new()
                } else {
                    format!("{}", rng.gen_range(1500..4500))
                },
                pick(&mut rng, &["88", "1", "14", "30", "77", "99"]),
            ];
            RawRecord::from_pairs(columns.iter().map(|c| c.as_str()).zip(values.iter().map(|v| v.as_str())))
        })
        .collect();

    RawCorpus::new(columns, rows)
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("survey.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("survey.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
