//! Persistence of fitted encoder state and feature schema
//!
//! Two JSON files live in an artifact directory, each with a header that
//! pins the format version and the registry the artifacts were fitted
//! against. Loading validates both files and their agreement with the
//! registry before anything is returned.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::encoder::{indicator_column, CategoricalEncoding, EncoderState};
use super::error::PipelineError;
use super::registry::FieldRegistry;
use super::schema::{ColumnSpec, FeatureSchema};

pub const FORMAT_VERSION: u32 = 1;
pub const ENCODER_FILE: &str = "encoder_state.json";
pub const SCHEMA_FILE: &str = "feature_schema.json";

/// Provenance stamped on every artifact file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub registry_version: String,
    pub registry_fingerprint: String,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub tool_version: String,
}

impl ArtifactHeader {
    pub fn new(registry: &FieldRegistry) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            registry_version: registry.version().to_string(),
            registry_fingerprint: registry.fingerprint().to_string(),
            created_at: Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn check(&self, artifact: &str, registry: &FieldRegistry) -> Result<(), PipelineError> {
        if self.format_version != FORMAT_VERSION {
            return Err(PipelineError::mismatch(
                artifact,
                format!(
                    "format version {} is not supported (expected {})",
                    self.format_version, FORMAT_VERSION
                ),
            ));
        }
        if self.registry_version != registry.version() {
            return Err(PipelineError::mismatch(
                artifact,
                format!(
                    "fitted against registry '{}', current registry is '{}'",
                    self.registry_version,
                    registry.version()
                ),
            ));
        }
        if self.registry_fingerprint != registry.fingerprint() {
            return Err(PipelineError::mismatch(
                artifact,
                "field rules changed since the artifacts were fitted",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldLabels {
    field: String,
    labels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncoderFile {
    header: ArtifactHeader,
    strategy: CategoricalEncoding,
    unseen_code: i64,
    unknown_value: f64,
    fields: Vec<FieldLabels>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaFile {
    header: ArtifactHeader,
    columns: Vec<ColumnSpec>,
}

/// Write both artifact files into `dir`, creating it if needed.
pub fn save(
    dir: &Path,
    registry: &FieldRegistry,
    encoder: &EncoderState,
    schema: &FeatureSchema,
) -> Result<(), PipelineError> {
    fs::create_dir_all(dir)?;
    let header = ArtifactHeader::new(registry);

    let encoder_file = EncoderFile {
        header: header.clone(),
        strategy: encoder.strategy(),
        unseen_code: encoder.unseen_code(),
        unknown_value: encoder.unknown_value(),
        fields: encoder
            .fields()
            .map(|(field, labels)| FieldLabels {
                field: field.to_string(),
                labels: labels.to_vec(),
            })
            .collect(),
    };
    fs::write(dir.join(ENCODER_FILE), serde_json::to_string_pretty(&encoder_file)?)?;

    let schema_file = SchemaFile {
        header,
        columns: schema.columns().to_vec(),
    };
    fs::write(dir.join(SCHEMA_FILE), serde_json::to_string_pretty(&schema_file)?)?;

    tracing::info!(dir = %dir.display(), columns = schema.len(), "artifacts saved");
    Ok(())
}

fn read_artifact<T: for<'de> Deserialize<'de>>(dir: &Path, name: &str) -> Result<T, PipelineError> {
    let path = dir.join(name);
    let text = fs::read_to_string(&path)
        .map_err(|e| PipelineError::mismatch(name, format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| PipelineError::mismatch(name, format!("unparseable: {}", e)))
}

/// Load and validate artifacts from `dir` against `registry`.
pub fn load(dir: &Path, registry: &FieldRegistry) -> Result<(EncoderState, FeatureSchema), PipelineError> {
    let encoder_file: EncoderFile = read_artifact(dir, ENCODER_FILE)?;
    let schema_file: SchemaFile = read_artifact(dir, SCHEMA_FILE)?;

    encoder_file.header.check(ENCODER_FILE, registry)?;
    schema_file.header.check(SCHEMA_FILE, registry)?;

    validate_encoder(&encoder_file, registry)?;
    validate_schema(&schema_file, registry)?;

    let encoder = EncoderState::from_parts(
        encoder_file.strategy,
        encoder_file.unseen_code,
        encoder_file.unknown_value,
        encoder_file
            .fields
            .into_iter()
            .map(|f| (f.field, f.labels))
            .collect(),
    );
    let schema = FeatureSchema::new(schema_file.columns);

    check_agreement(&encoder, &schema, registry)?;

    Ok((encoder, schema))
}

fn validate_encoder(file: &EncoderFile, registry: &FieldRegistry) -> Result<(), PipelineError> {
    if !file.unknown_value.is_finite() {
        return Err(PipelineError::mismatch(ENCODER_FILE, "unknown_value is not finite"));
    }
    // Fitted codes start at 0, so the reserved code must be negative.
    if file.unseen_code >= 0 {
        return Err(PipelineError::mismatch(
            ENCODER_FILE,
            format!("unseen_code {} collides with fitted category codes", file.unseen_code),
        ));
    }
    let mut fields = HashSet::new();
    for entry in &file.fields {
        let registered = registry
            .get(&entry.field)
            .is_some_and(|rule| rule.is_categorical());
        if !registered {
            return Err(PipelineError::mismatch(
                ENCODER_FILE,
                format!("'{}' is not a registered categorical field", entry.field),
            ));
        }
        if !fields.insert(entry.field.as_str()) {
            return Err(PipelineError::mismatch(
                ENCODER_FILE,
                format!("'{}' is listed twice", entry.field),
            ));
        }
        let mut labels = HashSet::new();
        if let Some(dup) = entry.labels.iter().find(|l| !labels.insert(l.as_str())) {
            return Err(PipelineError::mismatch(
                ENCODER_FILE,
                format!("'{}' lists label '{}' twice", entry.field, dup),
            ));
        }
    }
    Ok(())
}

fn validate_schema(file: &SchemaFile, registry: &FieldRegistry) -> Result<(), PipelineError> {
    if file.columns.is_empty() {
        return Err(PipelineError::mismatch(SCHEMA_FILE, "schema has no columns"));
    }
    let mut names = HashSet::new();
    for column in &file.columns {
        let registered = registry.get(&column.field).is_some_and(|rule| !rule.is_target());
        if !registered {
            return Err(PipelineError::mismatch(
                SCHEMA_FILE,
                format!("column '{}' refers to unregistered field '{}'", column.name, column.field),
            ));
        }
        if !column.default.is_finite() {
            return Err(PipelineError::mismatch(
                SCHEMA_FILE,
                format!("column '{}' has a non-finite default", column.name),
            ));
        }
        if !names.insert(column.name.as_str()) {
            return Err(PipelineError::mismatch(
                SCHEMA_FILE,
                format!("column '{}' is listed twice", column.name),
            ));
        }
    }
    Ok(())
}

/// Encoder and schema must describe the same categorical columns.
fn check_agreement(
    encoder: &EncoderState,
    schema: &FeatureSchema,
    registry: &FieldRegistry,
) -> Result<(), PipelineError> {
    for field in schema.fields() {
        let categorical = registry.get(field).is_some_and(|rule| rule.is_categorical());
        if categorical != encoder.is_categorical(field) {
            return Err(PipelineError::mismatch(
                SCHEMA_FILE,
                format!("field '{}' has no matching encoder entry", field),
            ));
        }
    }

    let schema_fields: HashSet<&str> = schema.fields().into_iter().collect();
    for (field, labels) in encoder.fields() {
        let expected: Vec<String> = match encoder.strategy() {
            CategoricalEncoding::Ordinal => vec![field.to_string()],
            CategoricalEncoding::OneHot => labels.iter().map(|l| indicator_column(field, l)).collect(),
        };
        if expected.is_empty() {
            continue;
        }
        if !schema_fields.contains(field) {
            return Err(PipelineError::mismatch(
                SCHEMA_FILE,
                format!("encoded field '{}' has no schema column", field),
            ));
        }
        let actual: HashSet<&str> = schema
            .columns()
            .iter()
            .filter(|c| c.field == field)
            .map(|c| c.name.as_str())
            .collect();
        if actual.len() != expected.len() || expected.iter().any(|c| !actual.contains(c.as_str())) {
            return Err(PipelineError::mismatch(
                SCHEMA_FILE,
                format!("columns for '{}' disagree with the {} encoder", field, encoder.strategy()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encoder::{CategoricalEncoder, UNSEEN_CODE};
    use crate::pipeline::rules::{FieldRule, LabelRule, Transform};
    use tempfile::TempDir;

    fn registry() -> FieldRegistry {
        FieldRegistry::from_rules(
            "test-1",
            vec![
                FieldRule::new("HTM4", Transform::Identity { min: None, max: None }),
                FieldRule::new(
                    "SEX",
                    Transform::Categorical {
                        labels: vec![
                            LabelRule { codes: vec![1], label: "male".into() },
                            LabelRule { codes: vec![2], label: "female".into() },
                        ],
                    },
                ),
            ],
        )
        .unwrap()
    }

    fn fitted() -> (EncoderState, FeatureSchema) {
        let encoder = EncoderState::from_parts(
            CategoricalEncoding::Ordinal,
            UNSEEN_CODE,
            -1.0,
            vec![("SEX".to_string(), vec!["female".to_string(), "male".to_string()])],
        );
        let registry = registry();
        let schema = FeatureSchema::capture(&["SEX".to_string(), "HTM4".to_string()], &registry, &encoder).unwrap();
        (encoder, schema)
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let (encoder, schema) = fitted();
        save(dir.path(), &registry, &encoder, &schema).unwrap();

        let (loaded_encoder, loaded_schema) = load(dir.path(), &registry).unwrap();
        assert_eq!(loaded_encoder, encoder);
        assert_eq!(loaded_schema, schema);
    }

    #[test]
    fn test_missing_file_is_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path(), &registry()).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref artifact, .. } if artifact == ENCODER_FILE));
    }

    #[test]
    fn test_registry_version_change_rejected() {
        let dir = TempDir::new().unwrap();
        let (encoder, schema) = fitted();
        save(dir.path(), &registry(), &encoder, &schema).unwrap();

        let newer = FieldRegistry::from_rules("test-2", registry().rules().to_vec()).unwrap();
        let err = load(dir.path(), &newer).unwrap_err();
        assert!(err.to_string().contains("test-1"));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = TempDir::new().unwrap();
        let (encoder, schema) = fitted();
        save(dir.path(), &registry(), &encoder, &schema).unwrap();

        let path = dir.path().join(SCHEMA_FILE);
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, &text[..text.len() / 2]).unwrap();
        let err = load(dir.path(), &registry()).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref artifact, .. } if artifact == SCHEMA_FILE));
    }

    #[test]
    fn test_non_negative_unseen_code_rejected() {
        let dir = TempDir::new().unwrap();
        let (encoder, schema) = fitted();
        save(dir.path(), &registry(), &encoder, &schema).unwrap();

        let path = dir.path().join(ENCODER_FILE);
        let mut json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["unseen_code"] = serde_json::json!(0);
        fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let err = load(dir.path(), &registry()).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref artifact, .. } if artifact == ENCODER_FILE));
        assert!(err.to_string().contains("unseen_code 0"));
    }

    #[test]
    fn test_fit_order_survives_round_trip() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let (record, _) = registry.normalize_record(&crate::pipeline::RawRecord::from_pairs([("SEX", "2")]));
        let encoder = CategoricalEncoder::default().fit(&["SEX".to_string()], &[record]);
        let schema = FeatureSchema::capture(&["SEX".to_string()], &registry, &encoder).unwrap();
        save(dir.path(), &registry, &encoder, &schema).unwrap();

        let (loaded, _) = load(dir.path(), &registry).unwrap();
        assert_eq!(loaded.code("SEX", "female"), Some(0));
    }
}
