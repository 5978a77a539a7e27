//! Fit and transform orchestration
//!
//! `Pipeline` is the unfit state. `fit_transform` consumes it and returns a
//! `FittedPipeline` together with the training table; the fitted pipeline
//! then transforms any number of records against its frozen encoder and
//! schema. A fitted pipeline only comes from a fit or from validated
//! artifacts.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use super::artifacts;
use super::encoder::{CategoricalEncoder, CategoricalEncoding, EncoderState, UnseenCategory, DEFAULT_UNKNOWN_VALUE};
use super::error::PipelineError;
use super::missing::{fields_above_threshold, profile_markers, MarkerProfile};
use super::registry::{FieldRegistry, NormalizationStats};
use super::schema::{FeatureSchema, FeatureVector};
use super::scoring::{Classifier, RiskBand};
use super::target::{count_labels, derive_labels, ExclusionReason, LabelCounts, MissingLabelReason};
use super::value::{RawCorpus, RawRecord};

/// Options for fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Required outcome fields. Empty means every registry outcome present
    /// in the input header.
    pub targets: Vec<String>,
    pub encoding: CategoricalEncoding,
    /// Numeric value written for `Unknown` in numeric columns.
    pub unknown_value: f64,
    /// Drop feature fields whose missing ratio among kept rows exceeds this.
    pub missing_threshold: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            encoding: CategoricalEncoding::Ordinal,
            unknown_value: DEFAULT_UNKNOWN_VALUE,
            missing_threshold: None,
        }
    }
}

/// One kept training row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    /// Position in the input corpus.
    pub source_index: usize,
    /// One label per required outcome, in outcome order.
    pub labels: Vec<u8>,
    pub features: FeatureVector,
}

/// Canonical training table: outcome columns first, then schema columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTable {
    pub targets: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<TrainingRow>,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows dropped for one outcome and reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionCount {
    pub field: String,
    pub reason: MissingLabelReason,
    pub rows: usize,
}

/// Label distribution of one outcome over the whole input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub field: String,
    #[serde(flatten)]
    pub counts: LabelCounts,
}

/// Everything worth reporting about a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub targets: Vec<String>,
    pub encoding: CategoricalEncoding,
    pub total_rows: usize,
    pub kept_rows: usize,
    pub excluded_rows: usize,
    pub exclusions: Vec<ExclusionCount>,
    pub outcomes: Vec<OutcomeSummary>,
    pub malformed_values: usize,
    pub out_of_domain_values: usize,
    pub unregistered_columns: Vec<String>,
    pub dropped_fields: Vec<String>,
    pub marker_profile: Vec<MarkerProfile>,
    pub feature_fields: usize,
    pub categorical_fields: usize,
    pub feature_columns: usize,
}

pub struct FitOutput {
    pub table: TrainingTable,
    pub report: FitReport,
}

/// Per-record diagnostics from a transform.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformDiagnostics {
    pub unseen: Vec<UnseenCategory>,
    pub malformed: usize,
    pub out_of_domain: usize,
    /// Raw fields with no rule.
    pub ignored_fields: Vec<String>,
}

impl TransformDiagnostics {
    fn new(stats: NormalizationStats, unseen: Vec<UnseenCategory>) -> Self {
        Self {
            unseen,
            malformed: stats.malformed,
            out_of_domain: stats.out_of_domain,
            ignored_fields: stats.unregistered,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.unseen.is_empty() && self.malformed == 0 && self.out_of_domain == 0 && self.ignored_fields.is_empty()
    }
}

/// An aligned vector and what happened while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub vector: FeatureVector,
    pub diagnostics: TransformDiagnostics,
}

/// Classifier output for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub probability: f64,
    pub band: RiskBand,
    pub transformed: Transformed,
}

/// Unfit pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: Arc<FieldRegistry>,
    config: PipelineConfig,
    targets: Vec<String>,
}

impl Pipeline {
    /// Validate the required outcomes against the registry.
    pub fn new(registry: Arc<FieldRegistry>, config: PipelineConfig) -> Result<Self, PipelineError> {
        let mut targets: Vec<String> = Vec::new();
        if config.targets.is_empty() {
            targets.extend(registry.target_rules().map(|r| r.name.clone()));
        } else {
            for name in &config.targets {
                let rule = registry
                    .get(name)
                    .ok_or_else(|| PipelineError::UnknownTarget(name.clone()))?;
                if !rule.is_target() {
                    return Err(PipelineError::NotATarget(name.clone()));
                }
                if !targets.contains(name) {
                    targets.push(name.clone());
                }
            }
        }

        Ok(Self {
            registry,
            config,
            targets,
        })
    }

    /// Candidate outcomes. With none named in the config, fitting keeps only
    /// those present in the input header.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fit encoder and schema on `corpus` and produce the training table.
    pub fn fit_transform(self, corpus: &RawCorpus) -> Result<(FittedPipeline, FitOutput), PipelineError> {
        if corpus.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        let registry = self.registry.as_ref();

        // Header classification
        let mut seen = HashSet::new();
        let mut feature_fields: Vec<String> = Vec::new();
        let mut unregistered_columns: Vec<String> = Vec::new();
        for column in &corpus.columns {
            if !seen.insert(column.as_str()) {
                continue;
            }
            match registry.get(column) {
                Some(rule) if !rule.is_target() => feature_fields.push(column.clone()),
                Some(_) => {}
                None => unregistered_columns.push(column.clone()),
            }
        }
        if !unregistered_columns.is_empty() {
            tracing::warn!(columns = ?unregistered_columns, "ignoring unregistered columns");
        }
        if feature_fields.is_empty() {
            return Err(PipelineError::NoFeatureFields);
        }

        // Without explicit outcomes, require only those the input carries.
        let targets: Vec<String> = if self.config.targets.is_empty() {
            let header: HashSet<&str> = corpus.columns.iter().map(String::as_str).collect();
            self.targets
                .iter()
                .filter(|t| header.contains(t.as_str()))
                .cloned()
                .collect()
        } else {
            self.targets.clone()
        };
        if targets.is_empty() {
            return Err(PipelineError::NoOutcomeFields);
        }

        let normalized: Vec<_> = corpus
            .rows
            .par_iter()
            .map(|raw| {
                let labels = derive_labels(registry, &targets, raw);
                let (record, stats) = registry.normalize_record(raw);
                (labels, record, stats)
            })
            .collect();

        let mut malformed_values = 0;
        let mut out_of_domain_values = 0;
        let mut exclusions: BTreeMap<ExclusionReason, usize> = BTreeMap::new();
        let mut kept = Vec::new();
        for (index, (labels, record, stats)) in normalized.into_iter().enumerate() {
            malformed_values += stats.malformed;
            out_of_domain_values += stats.out_of_domain;
            match labels {
                Ok(labels) => kept.push((index, labels, record)),
                Err(reason) => *exclusions.entry(reason).or_default() += 1,
            }
        }
        let excluded_rows = corpus.len() - kept.len();
        tracing::info!(kept = kept.len(), excluded = excluded_rows, "outcome filter applied");
        if kept.is_empty() {
            return Err(PipelineError::NoTrainingRows { rows: corpus.len() });
        }

        let records: Vec<_> = kept.iter().map(|(_, _, record)| record.clone()).collect();
        let marker_profile = profile_markers(&feature_fields, &records);
        let dropped_fields = match self.config.missing_threshold {
            Some(threshold) => fields_above_threshold(&marker_profile, threshold),
            None => Vec::new(),
        };
        if !dropped_fields.is_empty() {
            tracing::warn!(fields = ?dropped_fields, "dropping high-missing fields");
            feature_fields.retain(|f| !dropped_fields.contains(f));
            if feature_fields.is_empty() {
                return Err(PipelineError::NoFeatureFields);
            }
        }

        let categorical: Vec<String> = feature_fields
            .iter()
            .filter(|f| registry.get(f).is_some_and(|rule| rule.is_categorical()))
            .cloned()
            .collect();
        let encoder = CategoricalEncoder::new(self.config.encoding)
            .with_unknown_value(self.config.unknown_value)
            .fit(&categorical, &records);
        let schema = FeatureSchema::capture(&feature_fields, registry, &encoder)?;
        tracing::info!(
            fields = feature_fields.len(),
            categorical = categorical.len(),
            columns = schema.len(),
            "encoder and schema fitted"
        );

        let rows: Vec<TrainingRow> = kept
            .into_par_iter()
            .map(|(source_index, labels, record)| TrainingRow {
                source_index,
                labels,
                features: schema.align(&encoder.apply(&record).segment),
            })
            .collect();

        let report = FitReport {
            targets: targets.clone(),
            encoding: self.config.encoding,
            total_rows: corpus.len(),
            kept_rows: rows.len(),
            excluded_rows,
            exclusions: exclusions
                .into_iter()
                .map(|(reason, rows)| ExclusionCount {
                    field: reason.field,
                    reason: reason.reason,
                    rows,
                })
                .collect(),
            outcomes: targets
                .iter()
                .map(|field| OutcomeSummary {
                    field: field.clone(),
                    counts: count_labels(registry, field, &corpus.rows),
                })
                .collect(),
            malformed_values,
            out_of_domain_values,
            unregistered_columns,
            dropped_fields,
            marker_profile,
            feature_fields: feature_fields.len(),
            categorical_fields: categorical.len(),
            feature_columns: schema.len(),
        };
        let table = TrainingTable {
            targets,
            columns: schema.column_names().map(str::to_string).collect(),
            rows,
        };

        let fitted = FittedPipeline {
            registry: self.registry,
            encoder,
            schema,
        };
        Ok((fitted, FitOutput { table, report }))
    }
}

/// Pipeline with a frozen encoder and schema.
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    registry: Arc<FieldRegistry>,
    encoder: EncoderState,
    schema: FeatureSchema,
}

impl FittedPipeline {
    /// Load artifacts saved by `save_artifacts`, validated against `registry`.
    pub fn load(registry: Arc<FieldRegistry>, dir: &Path) -> Result<Self, PipelineError> {
        let (encoder, schema) = artifacts::load(dir, &registry)?;
        Ok(Self {
            registry,
            encoder,
            schema,
        })
    }

    pub fn save_artifacts(&self, dir: &Path) -> Result<(), PipelineError> {
        artifacts::save(dir, &self.registry, &self.encoder, &self.schema)
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn encoder(&self) -> &EncoderState {
        &self.encoder
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Transform one raw record into a schema-aligned vector.
    pub fn transform(&self, raw: &RawRecord) -> Transformed {
        let (record, stats) = self.registry.normalize_record(raw);
        let encoded = self.encoder.apply(&record);
        let vector = self.schema.align(&encoded.segment);
        Transformed {
            vector,
            diagnostics: TransformDiagnostics::new(stats, encoded.unseen),
        }
    }

    /// Transform many records; output order matches input order.
    pub fn transform_batch(&self, rows: &[RawRecord]) -> Vec<Transformed> {
        rows.par_iter().map(|raw| self.transform(raw)).collect()
    }

    /// Transform `raw` and hand the vector to `classifier`.
    pub fn score(&self, raw: &RawRecord, classifier: &dyn Classifier) -> anyhow::Result<Scored> {
        let transformed = self.transform(raw);
        let probability = classifier.predict_proba(&self.schema, &transformed.vector)?;
        if !(0.0..=1.0).contains(&probability) {
            anyhow::bail!("classifier returned {} which is not a probability", probability);
        }
        Ok(Scored {
            probability,
            band: RiskBand::from_probability(probability),
            transformed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rules::{FieldRule, LabelRule, Transform};
    use crate::pipeline::value::Marker;

    fn registry() -> Arc<FieldRegistry> {
        Arc::new(
            FieldRegistry::from_rules(
                "test",
                vec![
                    FieldRule::new("Y", Transform::Target { positive: vec![1], negative: vec![2] })
                        .sentinel(&[7, 9], Marker::Unknown),
                    FieldRule::new(
                        "SEX",
                        Transform::Categorical {
                            labels: vec![
                                LabelRule { codes: vec![1], label: "male".into() },
                                LabelRule { codes: vec![2], label: "female".into() },
                            ],
                        },
                    ),
                    FieldRule::new("HTM4", Transform::Identity { min: None, max: None }),
                ],
            )
            .unwrap(),
        )
    }

    fn corpus(rows: &[[&str; 3]]) -> RawCorpus {
        let columns = vec!["Y".to_string(), "SEX".to_string(), "HTM4".to_string()];
        let rows = rows
            .iter()
            .map(|r| RawRecord::from_pairs(columns.iter().map(|c| c.as_str()).zip(r.iter().copied())))
            .collect();
        RawCorpus::new(columns, rows)
    }

    #[test]
    fn test_unknown_and_non_target_rejected() {
        let config = PipelineConfig { targets: vec!["NOPE".into()], ..Default::default() };
        assert!(matches!(Pipeline::new(registry(), config), Err(PipelineError::UnknownTarget(_))));

        let config = PipelineConfig { targets: vec!["SEX".into()], ..Default::default() };
        assert!(matches!(Pipeline::new(registry(), config), Err(PipelineError::NotATarget(_))));
    }

    #[test]
    fn test_fit_excludes_and_counts() {
        let pipeline = Pipeline::new(registry(), PipelineConfig::default()).unwrap();
        let data = corpus(&[["1", "1", "170"], ["9", "2", "160"], ["2", "2", ""], ["", "1", "180"]]);
        let (fitted, output) = pipeline.fit_transform(&data).unwrap();

        assert_eq!(output.report.kept_rows, 2);
        assert_eq!(output.report.excluded_rows, 2);
        assert_eq!(output.table.columns, vec!["SEX".to_string(), "HTM4".to_string()]);
        assert_eq!(output.table.rows[0].labels, vec![1]);
        assert_eq!(output.table.rows[0].features, vec![0.0, 170.0]);
        assert_eq!(output.table.rows[1].features, vec![1.0, 0.0]);
        assert_eq!(fitted.encoder().code("SEX", "female"), Some(1));
    }

    #[test]
    fn test_empty_corpus() {
        let pipeline = Pipeline::new(registry(), PipelineConfig::default()).unwrap();
        let data = RawCorpus::new(vec!["Y".into()], Vec::new());
        assert!(matches!(pipeline.fit_transform(&data), Err(PipelineError::EmptyCorpus)));
    }

    #[test]
    fn test_header_without_outcomes() {
        let pipeline = Pipeline::new(registry(), PipelineConfig::default()).unwrap();
        let columns = vec!["SEX".to_string(), "HTM4".to_string()];
        let data = RawCorpus::new(columns, vec![RawRecord::from_pairs([("SEX", "1"), ("HTM4", "170")])]);
        assert!(matches!(pipeline.fit_transform(&data), Err(PipelineError::NoOutcomeFields)));
    }

    #[test]
    fn test_all_rows_excluded() {
        let pipeline = Pipeline::new(registry(), PipelineConfig::default()).unwrap();
        let data = corpus(&[["7", "1", "170"], ["", "2", "160"]]);
        assert!(matches!(
            pipeline.fit_transform(&data),
            Err(PipelineError::NoTrainingRows { rows: 2 })
        ));
    }

    #[test]
    fn test_score_rejects_non_probability() {
        let pipeline = Pipeline::new(registry(), PipelineConfig::default()).unwrap();
        let (fitted, _) = pipeline.fit_transform(&corpus(&[["1", "1", "170"]])).unwrap();
        let broken = |_: &FeatureSchema, _: &FeatureVector| -> anyhow::Result<f64> { Ok(1.5) };
        assert!(fitted.score(&RawRecord::new(), &broken).is_err());
    }

    #[test]
    fn test_fitted_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FittedPipeline>();
    }
}
