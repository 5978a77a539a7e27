//! Declarative per-field transform rules
//!
//! A `FieldRule` says how one raw survey field becomes a canonical value:
//! which codes are sentinels, how composite codes decode into units, and how
//! codes map to categorical labels. Rules are plain data (serde) so that a
//! whole table can be exported, reviewed and loaded back.

use serde::{Deserialize, Serialize};

use super::error::NormalizationError;
use super::sentinel;
use super::target::{self, DerivedLabel, MissingLabelReason};
use super::value::{CanonicalValue, Marker, RawValue};

/// Coarse classification of a rule, derived from its transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    NumericUnit,
    Categorical,
    Identity,
    Target,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::NumericUnit => write!(f, "numeric-unit"),
            RuleKind::Categorical => write!(f, "categorical"),
            RuleKind::Identity => write!(f, "identity"),
            RuleKind::Target => write!(f, "target"),
        }
    }
}

/// How the magnitude inside a band is turned into the common unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Decode {
    /// The code itself.
    Identity,
    /// `(code mod 100) * factor`
    Remainder { factor: f64 },
    /// `(code mod 100) / divisor`, rounded half to even.
    RemainderPer { divisor: f64 },
    /// `hmm` or `hhmm` to total minutes.
    HoursMinutes,
}

/// An inclusive code range with its decode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: i64,
    pub upper: i64,
    pub decode: Decode,
}

impl Band {
    pub const fn new(lower: i64, upper: i64, decode: Decode) -> Self {
        Self {
            lower,
            upper,
            decode,
        }
    }

    pub fn contains(&self, code: i64) -> bool {
        (self.lower..=self.upper).contains(&code)
    }

    pub fn decode(&self, code: i64) -> f64 {
        match self.decode {
            Decode::Identity => code as f64,
            Decode::Remainder { factor } => (code % 100) as f64 * factor,
            Decode::RemainderPer { divisor } => ((code % 100) as f64 / divisor).round_ties_even(),
            Decode::HoursMinutes => ((code / 100) * 60 + code % 100) as f64,
        }
    }
}

/// Codes sharing one label. Several codes may mean the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRule {
    pub codes: Vec<i64>,
    pub label: String,
}

/// Codes that short-circuit to a marker before any decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelRule {
    pub codes: Vec<i64>,
    pub marker: Marker,
}

/// The field-specific part of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Range-dispatched composite code.
    NumericUnit { bands: Vec<Band> },
    /// Code to label lookup.
    Categorical { labels: Vec<LabelRule> },
    /// Numeric passthrough with optional inclusive bounds.
    Identity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Binary outcome.
    Target { positive: Vec<i64>, negative: Vec<i64> },
}

fn default_blank() -> Marker {
    Marker::Missing
}

fn is_default_blank(marker: &Marker) -> bool {
    *marker == Marker::Missing
}

/// Rule for one raw field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sentinels: Vec<SentinelRule>,
    /// Marker for an absent or blank value.
    #[serde(default = "default_blank", skip_serializing_if = "is_default_blank")]
    pub blank: Marker,
    /// Aligner default for this field's columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<f64>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            transform,
            sentinels: Vec::new(),
            blank: Marker::Missing,
            fill: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sentinel(mut self, codes: &[i64], marker: Marker) -> Self {
        self.sentinels.push(SentinelRule {
            codes: codes.to_vec(),
            marker,
        });
        self
    }

    pub fn blank_as(mut self, marker: Marker) -> Self {
        self.blank = marker;
        self
    }

    pub fn fill(mut self, value: f64) -> Self {
        self.fill = Some(value);
        self
    }

    pub fn kind(&self) -> RuleKind {
        match self.transform {
            Transform::NumericUnit { .. } => RuleKind::NumericUnit,
            Transform::Categorical { .. } => RuleKind::Categorical,
            Transform::Identity { .. } => RuleKind::Identity,
            Transform::Target { .. } => RuleKind::Target,
        }
    }

    pub fn is_target(&self) -> bool {
        self.kind() == RuleKind::Target
    }

    pub fn is_categorical(&self) -> bool {
        self.kind() == RuleKind::Categorical
    }

    /// Marker declared for `code`, if it is a sentinel of this field.
    pub fn sentinel_for(&self, code: i64) -> Option<Marker> {
        self.sentinels
            .iter()
            .find(|s| s.codes.contains(&code))
            .map(|s| s.marker)
    }

    /// Every declared sentinel code.
    pub fn sentinel_codes(&self) -> impl Iterator<Item = i64> + '_ {
        self.sentinels.iter().flat_map(|s| s.codes.iter().copied())
    }

    /// Normalize one raw value. `None` means the field was absent or blank.
    pub fn normalize(&self, raw: Option<&RawValue>) -> Result<CanonicalValue, NormalizationError> {
        if let Some(marker) = sentinel::resolve(self, raw) {
            return Ok(CanonicalValue::Marker(marker));
        }
        let Some(raw) = raw else {
            return Ok(CanonicalValue::Marker(self.blank));
        };

        match &self.transform {
            Transform::NumericUnit { bands } => {
                let code = raw
                    .as_code()
                    .ok_or_else(|| self.malformed(raw, "integer code"))?;
                bands
                    .iter()
                    .find(|band| band.contains(code))
                    .map(|band| CanonicalValue::Number(band.decode(code)))
                    .ok_or_else(|| self.out_of_domain(code as f64))
            }
            Transform::Identity { min, max } => {
                let value = raw.as_number().ok_or_else(|| self.malformed(raw, "number"))?;
                let below = min.is_some_and(|m| value < m);
                let above = max.is_some_and(|m| value > m);
                if below || above {
                    Err(self.out_of_domain(value))
                } else {
                    Ok(CanonicalValue::Number(value))
                }
            }
            Transform::Categorical { labels } => {
                if let Some(code) = raw.as_code() {
                    let label = labels.iter().find(|l| l.codes.contains(&code));
                    Ok(match label {
                        Some(l) => CanonicalValue::Label(l.label.clone()),
                        None => CanonicalValue::Marker(Marker::Unknown),
                    })
                } else if let Some(text) = raw.as_text() {
                    Ok(CanonicalValue::Label(text.to_string()))
                } else {
                    Err(self.malformed(raw, "category code"))
                }
            }
            Transform::Target { .. } => match target::derive_label(self, Some(raw)) {
                DerivedLabel::Positive => Ok(CanonicalValue::Number(1.0)),
                DerivedLabel::Negative => Ok(CanonicalValue::Number(0.0)),
                DerivedLabel::Missing(MissingLabelReason::Malformed) => {
                    Err(self.malformed(raw, "outcome code"))
                }
                DerivedLabel::Missing(MissingLabelReason::Unrecognized) => {
                    Err(self.out_of_domain(raw.as_number().unwrap_or(f64::NAN)))
                }
                DerivedLabel::Missing(_) => Ok(CanonicalValue::MISSING),
            },
        }
    }

    fn malformed(&self, raw: &RawValue, expected: &'static str) -> NormalizationError {
        NormalizationError::MalformedValue {
            field: self.name.clone(),
            raw: raw.to_string(),
            expected,
        }
    }

    fn out_of_domain(&self, code: f64) -> NormalizationError {
        NormalizationError::OutOfDomainCode {
            field: self.name.clone(),
            code,
        }
    }

    /// Check the rule for internal contradictions.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("rule with an empty field name".to_string());
        }
        let name = &self.name;

        let mut sentinel_codes: Vec<i64> = self.sentinel_codes().collect();
        sentinel_codes.sort_unstable();
        if sentinel_codes.windows(2).any(|w| w[0] == w[1]) {
            return Err(format!("'{}': a sentinel code is declared twice", name));
        }

        if let Some(fill) = self.fill {
            if !fill.is_finite() {
                return Err(format!("'{}': fill value must be finite", name));
            }
        }

        match &self.transform {
            Transform::NumericUnit { bands } => {
                if bands.is_empty() {
                    return Err(format!("'{}': numeric-unit rule has no bands", name));
                }
                for band in bands {
                    if band.lower > band.upper {
                        return Err(format!(
                            "'{}': band {}..={} has lower > upper",
                            name, band.lower, band.upper
                        ));
                    }
                    match band.decode {
                        Decode::Remainder { factor } if !factor.is_finite() => {
                            return Err(format!("'{}': remainder factor must be finite", name));
                        }
                        Decode::RemainderPer { divisor } if divisor == 0.0 || !divisor.is_finite() => {
                            return Err(format!("'{}': remainder divisor must be non-zero", name));
                        }
                        _ => {}
                    }
                }
                let mut sorted: Vec<&Band> = bands.iter().collect();
                sorted.sort_by_key(|b| b.lower);
                if sorted.windows(2).any(|w| w[1].lower <= w[0].upper) {
                    return Err(format!("'{}': bands overlap", name));
                }
            }
            Transform::Categorical { labels } => {
                if labels.is_empty() {
                    return Err(format!("'{}': categorical rule has no labels", name));
                }
                if labels.iter().any(|l| l.label.is_empty() || l.codes.is_empty()) {
                    return Err(format!("'{}': label entries need a label and codes", name));
                }
                let mut codes: Vec<i64> = labels.iter().flat_map(|l| l.codes.iter().copied()).collect();
                codes.sort_unstable();
                if codes.windows(2).any(|w| w[0] == w[1]) {
                    return Err(format!("'{}': a code maps to more than one label", name));
                }
            }
            Transform::Identity { min, max } => {
                if min.is_some_and(|m| !m.is_finite()) || max.is_some_and(|m| !m.is_finite()) {
                    return Err(format!("'{}': identity bounds must be finite", name));
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(format!("'{}': identity min > max", name));
                    }
                }
            }
            Transform::Target { positive, negative } => {
                if positive.is_empty() || negative.is_empty() {
                    return Err(format!("'{}': outcome needs positive and negative codes", name));
                }
                if positive.iter().any(|c| negative.contains(c)) {
                    return Err(format!("'{}': a code is both positive and negative", name));
                }
                if sentinel_codes
                    .iter()
                    .any(|c| positive.contains(c) || negative.contains(c))
                {
                    return Err(format!("'{}': a sentinel code shadows an outcome code", name));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alcohol_days() -> FieldRule {
        FieldRule::new(
            "ALCDAY5",
            Transform::NumericUnit {
                bands: vec![
                    Band::new(101, 199, Decode::Remainder { factor: 4.0 }),
                    Band::new(201, 299, Decode::Remainder { factor: 1.0 }),
                ],
            },
        )
        .sentinel(&[888], Marker::Zero)
        .sentinel(&[777, 999], Marker::Unknown)
    }

    #[test]
    fn test_band_decodes() {
        let per_year = Band::new(401, 499, Decode::RemainderPer { divisor: 12.0 });
        assert_eq!(per_year.decode(424), 2.0);
        // 6 / 12 = 0.5 rounds to even
        assert_eq!(per_year.decode(406), 0.0);
        assert_eq!(per_year.decode(418), 2.0);

        let minutes = Band::new(1, 959, Decode::HoursMinutes);
        assert_eq!(minutes.decode(130), 90.0);
        assert_eq!(minutes.decode(45), 45.0);
    }

    #[test]
    fn test_weekly_and_monthly_bands() {
        let rule = alcohol_days();
        assert_eq!(
            rule.normalize(Some(&RawValue::Int(103))).unwrap(),
            CanonicalValue::Number(12.0)
        );
        assert_eq!(
            rule.normalize(Some(&RawValue::Int(215))).unwrap(),
            CanonicalValue::Number(15.0)
        );
    }

    #[test]
    fn test_sentinels_short_circuit() {
        let rule = alcohol_days();
        assert_eq!(
            rule.normalize(Some(&RawValue::Int(888))).unwrap(),
            CanonicalValue::Marker(Marker::Zero)
        );
        assert_eq!(
            rule.normalize(Some(&RawValue::Float(777.0))).unwrap(),
            CanonicalValue::Marker(Marker::Unknown)
        );
        assert_eq!(rule.normalize(None).unwrap(), CanonicalValue::MISSING);
    }

    #[test]
    fn test_out_of_domain_and_malformed() {
        let rule = alcohol_days();
        assert!(matches!(
            rule.normalize(Some(&RawValue::Int(350))),
            Err(NormalizationError::OutOfDomainCode { .. })
        ));
        assert!(matches!(
            rule.normalize(Some(&RawValue::Text("often".into()))),
            Err(NormalizationError::MalformedValue { .. })
        ));
        assert!(matches!(
            rule.normalize(Some(&RawValue::Float(201.5))),
            Err(NormalizationError::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_categorical_many_to_one_and_unlisted() {
        let rule = FieldRule::new(
            "PREDIAB1",
            Transform::Categorical {
                labels: vec![
                    LabelRule { codes: vec![1, 2], label: "Yes".into() },
                    LabelRule { codes: vec![3], label: "No".into() },
                ],
            },
        )
        .sentinel(&[7, 9], Marker::Unknown);

        for code in [1, 2] {
            assert_eq!(
                rule.normalize(Some(&RawValue::Int(code))).unwrap(),
                CanonicalValue::Label("Yes".into())
            );
        }
        assert_eq!(
            rule.normalize(Some(&RawValue::Int(5))).unwrap(),
            CanonicalValue::Marker(Marker::Unknown)
        );
        assert_eq!(
            rule.normalize(Some(&RawValue::Text("No".into()))).unwrap(),
            CanonicalValue::Label("No".into())
        );
    }

    #[test]
    fn test_identity_bounds() {
        let rule = FieldRule::new(
            "PHYSHLTH",
            Transform::Identity { min: Some(1.0), max: Some(30.0) },
        )
        .sentinel(&[88], Marker::Zero)
        .sentinel(&[77, 99], Marker::Unknown);

        assert_eq!(
            rule.normalize(Some(&RawValue::Int(14))).unwrap(),
            CanonicalValue::Number(14.0)
        );
        assert_eq!(
            rule.normalize(Some(&RawValue::Int(88))).unwrap(),
            CanonicalValue::Marker(Marker::Zero)
        );
        assert!(rule.normalize(Some(&RawValue::Int(45))).is_err());
    }

    #[test]
    fn test_blank_policy_override() {
        let rule = FieldRule::new(
            "HAVARTH3",
            Transform::Categorical {
                labels: vec![LabelRule { codes: vec![1], label: "Yes".into() }],
            },
        )
        .blank_as(Marker::Unknown);
        assert_eq!(rule.normalize(None).unwrap(), CanonicalValue::Marker(Marker::Unknown));
    }

    #[test]
    fn test_validate_rejects_overlapping_bands() {
        let rule = FieldRule::new(
            "X",
            Transform::NumericUnit {
                bands: vec![
                    Band::new(101, 199, Decode::Identity),
                    Band::new(150, 250, Decode::Identity),
                ],
            },
        );
        assert!(rule.validate().unwrap_err().contains("overlap"));
    }

    #[test]
    fn test_validate_rejects_shadowed_outcome() {
        let rule = FieldRule::new(
            "Y",
            Transform::Target { positive: vec![1], negative: vec![2] },
        )
        .sentinel(&[1], Marker::Unknown);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_rule_json_shape() {
        let json = serde_json::to_value(alcohol_days()).unwrap();
        assert_eq!(json["transform"]["kind"], "numeric_unit");
        assert_eq!(json["transform"]["bands"][0]["decode"]["op"], "remainder");
        let back: FieldRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, alcohol_days());
    }
}
