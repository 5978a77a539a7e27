//! File adapters for CSV, Parquet and JSON records

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;

use super::orchestrator::{TrainingTable, Transformed};
use super::registry::FieldRegistry;
use super::schema::FeatureSchema;
use super::value::{RawCorpus, RawRecord};

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset lazily (CSV or Parquet based on extension).
///
/// CSV columns are all read as text; values are parsed per field later.
pub fn load_dataset(path: &Path) -> Result<LazyFrame> {
    let extension = extension_of(path);

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(0))
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Read a raw survey corpus, keeping the header order of the file.
pub fn load_raw_corpus(path: &Path, registry: &FieldRegistry) -> Result<RawCorpus> {
    let df = load_dataset(path)?
        .collect()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    dataframe_to_corpus(&df, registry)
}

/// Convert a DataFrame into raw records. Nulls and blank cells are absent.
///
/// Every header column is listed in `columns`, but only values of columns
/// with a rule in `registry` are stored in the rows.
pub fn dataframe_to_corpus(df: &DataFrame, registry: &FieldRegistry) -> Result<RawCorpus> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let mut rows = vec![RawRecord::new(); df.height()];

    for name in columns.iter().filter(|c| registry.contains(c.as_str())) {
        let column = df
            .column(name)?
            .cast(&DataType::String)
            .with_context(|| format!("Column '{}' cannot be read as text", name))?;
        let field: Arc<str> = Arc::from(name.as_str());
        for (row, value) in rows.iter_mut().zip(column.str()?.into_iter()) {
            if let Some(token) = value {
                row.set_shared(&field, token);
            }
        }
    }

    Ok(RawCorpus::new(columns, rows))
}

/// Parse a single JSON object into a raw record.
pub fn parse_record_json(json: &str) -> Result<RawRecord> {
    serde_json::from_str(json).context("Record must be a JSON object of field names to values")
}

pub fn read_record_json(path: &Path) -> Result<RawRecord> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read record file: {}", path.display()))?;
    parse_record_json(&json)
}

/// Outcome columns first, then every schema column.
pub fn training_table_to_dataframe(table: &TrainingTable) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(table.targets.len() + table.columns.len());

    for (t, target) in table.targets.iter().enumerate() {
        let values: Vec<i32> = table.rows.iter().map(|r| i32::from(r.labels[t])).collect();
        columns.push(Column::new(target.as_str().into(), values));
    }
    for (c, name) in table.columns.iter().enumerate() {
        let values: Vec<f64> = table.rows.iter().map(|r| r.features[c]).collect();
        columns.push(Column::new(name.as_str().into(), values));
    }

    DataFrame::new(columns).context("Failed to assemble training table")
}

/// Schema columns for a batch of transformed records.
pub fn feature_rows_to_dataframe(schema: &FeatureSchema, rows: &[Transformed]) -> Result<DataFrame> {
    let columns: Vec<Column> = schema
        .column_names()
        .enumerate()
        .map(|(c, name)| {
            let values: Vec<f64> = rows.iter().map(|r| r.vector[c]).collect();
            Column::new(name.into(), values)
        })
        .collect();
    DataFrame::new(columns).context("Failed to assemble feature table")
}

/// Save a DataFrame (CSV or Parquet based on extension).
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = extension_of(path);

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}

pub fn save_training_table(table: &TrainingTable, path: &Path) -> Result<()> {
    let mut df = training_table_to_dataframe(table)?;
    save_dataset(&mut df, path)
}

pub fn save_feature_rows(schema: &FeatureSchema, rows: &[Transformed], path: &Path) -> Result<()> {
    let mut df = feature_rows_to_dataframe(schema, rows)?;
    save_dataset(&mut df, path)
}
