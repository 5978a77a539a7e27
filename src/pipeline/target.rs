//! Outcome label derivation
//!
//! Outcome fields carry several codes that mean "yes" (diagnosed, borderline,
//! pregnancy-only) plus don't-know/refused sentinels. Each is collapsed to a
//! binary label, and rows without a usable label are excluded rather than
//! imputed.

use serde::Serialize;

use super::registry::FieldRegistry;
use super::rules::{FieldRule, Transform};
use super::value::{RawRecord, RawValue};

/// Why an outcome has no binary label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingLabelReason {
    /// Absent or blank.
    Blank,
    /// A declared don't-know/refused code.
    Sentinel,
    /// A code outside the positive, negative and sentinel sets.
    Unrecognized,
    /// Not readable as an integer code.
    Malformed,
}

impl std::fmt::Display for MissingLabelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingLabelReason::Blank => write!(f, "blank"),
            MissingLabelReason::Sentinel => write!(f, "sentinel"),
            MissingLabelReason::Unrecognized => write!(f, "unrecognized code"),
            MissingLabelReason::Malformed => write!(f, "malformed"),
        }
    }
}

/// Result of deriving one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedLabel {
    Positive,
    Negative,
    Missing(MissingLabelReason),
}

impl DerivedLabel {
    /// `Some(1)` / `Some(0)`, or `None` when the label is missing.
    pub fn value(&self) -> Option<u8> {
        match self {
            DerivedLabel::Positive => Some(1),
            DerivedLabel::Negative => Some(0),
            DerivedLabel::Missing(_) => None,
        }
    }
}

/// The first required outcome that made a row unusable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExclusionReason {
    pub field: String,
    pub reason: MissingLabelReason,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Derive the binary label for an outcome rule.
///
/// Non-target rules never produce a label and report `Unrecognized`.
pub fn derive_label(rule: &FieldRule, raw: Option<&RawValue>) -> DerivedLabel {
    let Transform::Target { positive, negative } = &rule.transform else {
        return DerivedLabel::Missing(MissingLabelReason::Unrecognized);
    };
    let Some(raw) = raw else {
        return DerivedLabel::Missing(MissingLabelReason::Blank);
    };
    let Some(code) = raw.as_code() else {
        return DerivedLabel::Missing(MissingLabelReason::Malformed);
    };

    if rule.sentinel_for(code).is_some() {
        DerivedLabel::Missing(MissingLabelReason::Sentinel)
    } else if positive.contains(&code) {
        DerivedLabel::Positive
    } else if negative.contains(&code) {
        DerivedLabel::Negative
    } else {
        DerivedLabel::Missing(MissingLabelReason::Unrecognized)
    }
}

/// Labels for every required outcome, in the given order.
///
/// The first outcome without a 0/1 label excludes the row. Unregistered
/// outcome names are reported as `Unrecognized`; `Pipeline::new` rejects them
/// before this is ever reached.
pub fn derive_labels(
    registry: &FieldRegistry,
    required_targets: &[String],
    raw: &RawRecord,
) -> Result<Vec<u8>, ExclusionReason> {
    required_targets
        .iter()
        .map(|field| {
            let label = match registry.get(field) {
                Some(rule) => derive_label(rule, raw.get(field)),
                None => DerivedLabel::Missing(MissingLabelReason::Unrecognized),
            };
            match label {
                DerivedLabel::Missing(reason) => Err(ExclusionReason {
                    field: field.clone(),
                    reason,
                }),
                other => Ok(other.value().unwrap_or_default()),
            }
        })
        .collect()
}

/// Positive, negative and missing counts for one outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub missing: usize,
}

/// Count derived labels for `field` over `rows`.
pub fn count_labels(registry: &FieldRegistry, field: &str, rows: &[RawRecord]) -> LabelCounts {
    let mut counts = LabelCounts::default();
    let Some(rule) = registry.get(field) else {
        counts.missing = rows.len();
        return counts;
    };
    for row in rows {
        match derive_label(rule, row.get(field)) {
            DerivedLabel::Positive => counts.positive += 1,
            DerivedLabel::Negative => counts.negative += 1,
            DerivedLabel::Missing(_) => counts.missing += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::value::Marker;

    fn diabetes() -> FieldRule {
        FieldRule::new(
            "DIABETE3",
            Transform::Target {
                positive: vec![1, 2, 4],
                negative: vec![3],
            },
        )
        .sentinel(&[7, 9], Marker::Unknown)
    }

    #[test]
    fn test_derive_many_to_one_positive() {
        let rule = diabetes();
        for code in [1, 2, 4] {
            assert_eq!(derive_label(&rule, Some(&RawValue::Int(code))), DerivedLabel::Positive);
        }
        assert_eq!(derive_label(&rule, Some(&RawValue::Int(3))), DerivedLabel::Negative);
    }

    #[test]
    fn test_derive_missing_reasons() {
        let rule = diabetes();
        assert_eq!(
            derive_label(&rule, None),
            DerivedLabel::Missing(MissingLabelReason::Blank)
        );
        assert_eq!(
            derive_label(&rule, Some(&RawValue::Int(9))),
            DerivedLabel::Missing(MissingLabelReason::Sentinel)
        );
        assert_eq!(
            derive_label(&rule, Some(&RawValue::Int(5))),
            DerivedLabel::Missing(MissingLabelReason::Unrecognized)
        );
        assert_eq!(
            derive_label(&rule, Some(&RawValue::Text("yes".into()))),
            DerivedLabel::Missing(MissingLabelReason::Malformed)
        );
    }

    #[test]
    fn test_label_values() {
        assert_eq!(DerivedLabel::Positive.value(), Some(1));
        assert_eq!(DerivedLabel::Negative.value(), Some(0));
        assert_eq!(DerivedLabel::Missing(MissingLabelReason::Blank).value(), None);
    }

    #[test]
    fn test_non_target_rule_has_no_label() {
        let rule = FieldRule::new("HTM4", Transform::Identity { min: None, max: None });
        assert_eq!(
            derive_label(&rule, Some(&RawValue::Int(1))),
            DerivedLabel::Missing(MissingLabelReason::Unrecognized)
        );
    }
}
