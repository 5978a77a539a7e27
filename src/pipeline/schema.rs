//! Feature schema capture and alignment
//!
//! The schema is the frozen, ordered column contract fixed at fit time.
//! Every vector produced afterwards has exactly these columns in exactly this
//! order, whatever subset of fields the raw input supplied.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::artifacts::SCHEMA_FILE;
use super::encoder::{indicator_column, CategoricalEncoding, EncoderState, FeatureSegment};
use super::error::PipelineError;
use super::registry::FieldRegistry;

/// Values aligned to a `FeatureSchema`.
pub type FeatureVector = Vec<f64>;

/// One output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Raw field the column derives from.
    pub field: String,
    /// Value used when a record supplies nothing for this column.
    pub default: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<ColumnSpec>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self { columns, index }
    }

    /// Build the column list for `fields` (training header order).
    ///
    /// Fields without a rule are skipped. Two fields generating the same
    /// column name is an error, since the schema could not be reloaded.
    pub fn capture(
        fields: &[String],
        registry: &FieldRegistry,
        encoder: &EncoderState,
    ) -> Result<Self, PipelineError> {
        let mut columns: Vec<ColumnSpec> = Vec::new();
        let mut taken = std::collections::HashSet::new();

        for field in fields {
            let Some(rule) = registry.get(field) else {
                continue;
            };

            let specs: Vec<ColumnSpec> = match encoder.labels(field) {
                Some(labels) if encoder.strategy() == CategoricalEncoding::OneHot => labels
                    .iter()
                    .map(|label| ColumnSpec {
                        name: indicator_column(field, label),
                        field: field.clone(),
                        default: rule.fill.unwrap_or(0.0),
                    })
                    .collect(),
                Some(_) => vec![ColumnSpec {
                    name: field.clone(),
                    field: field.clone(),
                    default: rule.fill.unwrap_or(encoder.unseen_code() as f64),
                }],
                None => vec![ColumnSpec {
                    name: field.clone(),
                    field: field.clone(),
                    default: rule.fill.unwrap_or(0.0),
                }],
            };

            for spec in specs {
                if !taken.insert(spec.name.clone()) {
                    return Err(PipelineError::mismatch(
                        SCHEMA_FILE,
                        format!("column '{}' of field '{}' is generated twice", spec.name, spec.field),
                    ));
                }
                columns.push(spec);
            }
        }

        Ok(Self::new(columns))
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Distinct source fields, in column order.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for column in &self.columns {
            if !fields.contains(&column.field.as_str()) {
                fields.push(column.field.as_str());
            }
        }
        fields
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Place segment entries into schema order.
    ///
    /// Absent columns take their default and entries for columns outside the
    /// schema are dropped.
    pub fn align(&self, segment: &FeatureSegment<'_>) -> FeatureVector {
        let mut vector: FeatureVector = self.columns.iter().map(|c| c.default).collect();
        for (column, value) in segment.iter() {
            if let Some(&i) = self.index.get(column) {
                vector[i] = value;
            }
        }
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            ColumnSpec { name: "GENHLTH".into(), field: "GENHLTH".into(), default: -1.0 },
            ColumnSpec { name: "HTM4".into(), field: "HTM4".into(), default: 0.0 },
            ColumnSpec { name: "ALCDAY5".into(), field: "ALCDAY5".into(), default: 0.0 },
        ])
    }

    #[test]
    fn test_align_fills_defaults() {
        let mut segment = FeatureSegment::new();
        segment.push("HTM4", 170.0);
        assert_eq!(schema().align(&segment), vec![-1.0, 170.0, 0.0]);
    }

    #[test]
    fn test_align_drops_foreign_columns() {
        let mut segment = FeatureSegment::new();
        segment.push("ALCDAY5", 12.0);
        segment.push("NOT_A_COLUMN", 99.0);
        segment.push("GENHLTH", 2.0);
        assert_eq!(schema().align(&segment), vec![2.0, 0.0, 12.0]);
    }

    #[test]
    fn test_empty_segment_is_all_defaults() {
        let schema = schema();
        let vector = schema.align(&FeatureSegment::new());
        assert_eq!(vector.len(), schema.len());
        assert_eq!(vector, vec![-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_colliding_indicator_columns_fail_capture() {
        use crate::pipeline::rules::{FieldRule, LabelRule, Transform};

        let categorical = |name: &str, label: &str| {
            FieldRule::new(
                name,
                Transform::Categorical {
                    labels: vec![LabelRule { codes: vec![1], label: label.into() }],
                },
            )
        };
        let registry =
            FieldRegistry::from_rules("t", vec![categorical("A", "B_C"), categorical("A_B", "C")]).unwrap();
        let encoder = EncoderState::from_parts(
            CategoricalEncoding::OneHot,
            -1,
            -1.0,
            vec![
                ("A".to_string(), vec!["B_C".to_string()]),
                ("A_B".to_string(), vec!["C".to_string()]),
            ],
        );

        let err = FeatureSchema::capture(&["A".to_string(), "A_B".to_string()], &registry, &encoder).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref artifact, .. } if artifact == SCHEMA_FILE));
        assert!(err.to_string().contains("A_B_C"));
    }

    #[test]
    fn test_fields_deduplicated() {
        let schema = FeatureSchema::new(vec![
            ColumnSpec { name: "SEX_male".into(), field: "SEX".into(), default: 0.0 },
            ColumnSpec { name: "SEX_female".into(), field: "SEX".into(), default: 0.0 },
            ColumnSpec { name: "HTM4".into(), field: "HTM4".into(), default: 0.0 },
        ]);
        assert_eq!(schema.fields(), vec!["SEX", "HTM4"]);
    }
}
