//! Field transform registry
//!
//! A versioned, read-only table of `FieldRule`s with a name index. The
//! standard BRFSS table is built once per process; a replacement table can be
//! loaded from JSON.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::catalog;
use super::error::{NormalizationError, PipelineError};
use super::rules::FieldRule;
use super::sentinel;
use super::value::{CanonicalRecord, CanonicalValue, FieldLayout, Marker, RawRecord, RawValue};

static STANDARD: OnceLock<Arc<FieldRegistry>> = OnceLock::new();

/// On-disk shape of a rule table.
#[derive(Serialize, Deserialize)]
struct RegistryFile {
    version: String,
    rules: Vec<FieldRule>,
}

/// Counts gathered while normalizing one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStats {
    pub malformed: usize,
    pub out_of_domain: usize,
    /// Raw fields with no rule, ignored.
    pub unregistered: Vec<String>,
}

impl NormalizationStats {
    pub fn error_count(&self) -> usize {
        self.malformed + self.out_of_domain
    }

    fn record(&mut self, error: &NormalizationError) {
        match error {
            NormalizationError::MalformedValue { .. } => self.malformed += 1,
            NormalizationError::OutOfDomainCode { .. } => self.out_of_domain += 1,
            NormalizationError::UnregisteredField { field } => self.unregistered.push(field.clone()),
        }
    }
}

#[derive(Debug)]
pub struct FieldRegistry {
    version: String,
    rules: Vec<FieldRule>,
    index: HashMap<String, usize>,
    feature_layout: Arc<FieldLayout>,
    fingerprint: String,
}

impl FieldRegistry {
    /// The built-in BRFSS 2015 table, shared for the life of the process.
    pub fn standard() -> Arc<FieldRegistry> {
        STANDARD
            .get_or_init(|| Arc::new(catalog::standard_registry()))
            .clone()
    }

    /// Build and validate a registry.
    pub fn from_rules(version: impl Into<String>, rules: Vec<FieldRule>) -> Result<Self, PipelineError> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(PipelineError::InvalidRegistry("empty registry version".to_string()));
        }

        let mut seen = std::collections::HashSet::with_capacity(rules.len());
        for rule in &rules {
            rule.validate().map_err(PipelineError::InvalidRegistry)?;
            if !seen.insert(rule.name.as_str()) {
                return Err(PipelineError::InvalidRegistry(format!(
                    "field '{}' is declared twice",
                    rule.name
                )));
            }
        }

        Ok(Self::assemble(version, rules))
    }

    /// Index an already validated table.
    pub(crate) fn assemble(version: impl Into<String>, rules: Vec<FieldRule>) -> Self {
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.name.clone(), i))
            .collect();
        let feature_layout: FieldLayout = rules
            .iter()
            .filter(|r| !r.is_target())
            .map(|r| r.name.clone())
            .collect();
        let fingerprint = fingerprint_rules(&rules);

        Self {
            version: version.into(),
            rules,
            index,
            feature_layout: Arc::new(feature_layout),
            fingerprint,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::from_rules(file.version, file.rules)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        let file = RegistryFile {
            version: self.version.clone(),
            rules: self.rules.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// FNV-1a digest of the serialized rules, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.index.get(field).map(|&i| &self.rules[i])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn feature_rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter().filter(|r| !r.is_target())
    }

    pub fn target_rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter().filter(|r| r.is_target())
    }

    /// Names of every non-outcome field, in registry order.
    pub fn feature_names(&self) -> &[String] {
        self.feature_layout.names()
    }

    pub fn try_normalize(
        &self,
        field: &str,
        raw: Option<&RawValue>,
    ) -> Result<CanonicalValue, NormalizationError> {
        let rule = self
            .get(field)
            .ok_or_else(|| NormalizationError::UnregisteredField {
                field: field.to_string(),
            })?;
        rule.normalize(raw)
    }

    /// Normalize one value; any error resolves to `Missing`.
    pub fn normalize(&self, field: &str, raw: Option<&RawValue>) -> CanonicalValue {
        self.try_normalize(field, raw)
            .unwrap_or(CanonicalValue::MISSING)
    }

    pub fn resolve_sentinel(&self, field: &str, raw: Option<&RawValue>) -> Option<Marker> {
        self.get(field).and_then(|rule| sentinel::resolve(rule, raw))
    }

    /// Normalize every feature field of the registry for one raw record.
    pub fn normalize_record(&self, raw: &RawRecord) -> (CanonicalRecord, NormalizationStats) {
        let mut stats = NormalizationStats::default();

        let values = self
            .feature_rules()
            .map(|rule| match rule.normalize(raw.get(&rule.name)) {
                Ok(value) => value,
                Err(error) => {
                    tracing::debug!(%error, "value resolved to missing");
                    stats.record(&error);
                    CanonicalValue::MISSING
                }
            })
            .collect();

        stats.unregistered = raw
            .fields()
            .filter(|field| !self.contains(field))
            .map(str::to_string)
            .collect();

        (CanonicalRecord::new(Arc::clone(&self.feature_layout), values), stats)
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fingerprint_rules(rules: &[FieldRule]) -> String {
    // Rules are plain data with string keys; serialization cannot fail.
    let bytes = serde_json::to_vec(rules).unwrap_or_default();
    let hash = bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    });
    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rules::{LabelRule, Transform};

    fn small_rules() -> Vec<FieldRule> {
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
            FieldRule::new("Y", Transform::Target { positive: vec![1], negative: vec![2] }),
        ]
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut rules = small_rules();
        rules.push(FieldRule::new("HTM4", Transform::Identity { min: None, max: None }));
        let err = FieldRegistry::from_rules("t", rules).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_feature_names_skip_targets() {
        let registry = FieldRegistry::from_rules("t", small_rules()).unwrap();
        assert_eq!(&registry.feature_names()[..], &["HTM4".to_string(), "SEX".to_string()]);
        assert_eq!(registry.target_rules().count(), 1);
    }

    #[test]
    fn test_normalize_record_counts_errors() {
        let registry = FieldRegistry::from_rules("t", small_rules()).unwrap();
        let raw = RawRecord::from_pairs([("HTM4", "tall"), ("SEX", "2"), ("EXTRA", "1")]);
        let (record, stats) = registry.normalize_record(&raw);

        assert_eq!(record.get("HTM4"), Some(&CanonicalValue::MISSING));
        assert_eq!(record.get("SEX"), Some(&CanonicalValue::Label("female".into())));
        assert!(record.get("Y").is_none());
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.unregistered, vec!["EXTRA".to_string()]);
    }

    #[test]
    fn test_unregistered_field() {
        let registry = FieldRegistry::from_rules("t", small_rules()).unwrap();
        assert!(matches!(
            registry.try_normalize("NOPE", Some(&RawValue::Int(1))),
            Err(NormalizationError::UnregisteredField { .. })
        ));
        assert_eq!(registry.normalize("NOPE", Some(&RawValue::Int(1))), CanonicalValue::MISSING);
    }

    #[test]
    fn test_json_round_trip_keeps_fingerprint() {
        let registry = FieldRegistry::from_rules("t", small_rules()).unwrap();
        let loaded = FieldRegistry::from_json_str(&registry.to_json().unwrap()).unwrap();
        assert_eq!(loaded.version(), "t");
        assert_eq!(loaded.fingerprint(), registry.fingerprint());
        assert_eq!(registry.fingerprint().len(), 16);
    }
}
