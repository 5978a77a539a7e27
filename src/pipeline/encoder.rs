//! Categorical encoding
//!
//! Labels are assigned integer codes in first-seen order during fitting. The
//! fitted `EncoderState` is frozen and applied identically to every batch or
//! single record afterwards. Labels never seen during fitting map to a
//! reserved code (ordinal) or to no indicator at all (one-hot).

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::value::{CanonicalRecord, CanonicalValue, FieldCursor, Marker};

/// Reserved ordinal code for labels absent at fit time.
pub const UNSEEN_CODE: i64 = -1;

/// Numeric stand-in for the `Unknown` marker in numeric columns.
pub const DEFAULT_UNKNOWN_VALUE: f64 = -1.0;

/// Encoding strategy for categorical fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalEncoding {
    /// One column per field holding the label code.
    #[default]
    Ordinal,
    /// One 0/1 indicator column per fitted label.
    OneHot,
}

impl std::fmt::Display for CategoricalEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoricalEncoding::Ordinal => write!(f, "ordinal"),
            CategoricalEncoding::OneHot => write!(f, "one-hot"),
        }
    }
}

impl std::str::FromStr for CategoricalEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ordinal" => Ok(CategoricalEncoding::Ordinal),
            "one-hot" | "one_hot" | "onehot" => Ok(CategoricalEncoding::OneHot),
            _ => Err(format!(
                "Unknown encoding: '{}'. Use 'ordinal' or 'one-hot'.",
                s
            )),
        }
    }
}

/// A categorical label not present in the fitted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnseenCategory {
    pub field: String,
    pub label: String,
}

/// Category key used for fitting and lookup.
///
/// `Unknown` and `Zero` become labels of their own; `Missing` has no key.
pub fn category_key(value: &CanonicalValue) -> Option<Cow<'_, str>> {
    match value {
        CanonicalValue::Label(label) => Some(Cow::Borrowed(label.as_str())),
        CanonicalValue::Marker(Marker::Unknown) => Some(Cow::Borrowed("Unknown")),
        CanonicalValue::Marker(Marker::Zero) => Some(Cow::Borrowed("Zero")),
        CanonicalValue::Marker(Marker::Missing) => None,
        CanonicalValue::Number(n) => Some(Cow::Owned(n.to_string())),
    }
}

/// Fitted labels for one categorical field.
#[derive(Debug, Clone, PartialEq)]
struct FieldCategories {
    field: String,
    labels: Vec<String>,
    /// One-hot column names, parallel to `labels`.
    indicators: Vec<String>,
    codes: HashMap<String, usize>,
}

impl FieldCategories {
    fn new(field: String, labels: Vec<String>) -> Self {
        let codes = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        let indicators = labels
            .iter()
            .map(|label| indicator_column(&field, label))
            .collect();
        Self {
            field,
            labels,
            indicators,
            codes,
        }
    }
}

/// One-hot column name for `field` and `label`.
pub fn indicator_column(field: &str, label: &str) -> String {
    format!("{}_{}", field, label)
}

/// Frozen result of fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderState {
    strategy: CategoricalEncoding,
    unseen_code: i64,
    unknown_value: f64,
    fields: Vec<FieldCategories>,
    index: HashMap<String, usize>,
}

/// Column entries produced for one record, before alignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSegment<'a> {
    entries: Vec<(Cow<'a, str>, f64)>,
}

impl<'a> FeatureSegment<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<Cow<'a, str>>, value: f64) {
        self.entries.push((column.into(), value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(c, v)| (c.as_ref(), *v))
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Output of `EncoderState::apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord<'a> {
    pub segment: FeatureSegment<'a>,
    pub unseen: Vec<UnseenCategory>,
}

impl EncoderState {
    /// Rebuild a state from persisted parts.
    pub fn from_parts(
        strategy: CategoricalEncoding,
        unseen_code: i64,
        unknown_value: f64,
        fields: Vec<(String, Vec<String>)>,
    ) -> Self {
        let fields: Vec<FieldCategories> = fields
            .into_iter()
            .map(|(field, labels)| FieldCategories::new(field, labels))
            .collect();
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.field.clone(), i))
            .collect();
        Self {
            strategy,
            unseen_code,
            unknown_value,
            fields,
            index,
        }
    }

    pub fn strategy(&self) -> CategoricalEncoding {
        self.strategy
    }

    pub fn unseen_code(&self) -> i64 {
        self.unseen_code
    }

    pub fn unknown_value(&self) -> f64 {
        self.unknown_value
    }

    pub fn is_categorical(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    /// Categorical fields and their labels, in fit order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|f| (f.field.as_str(), f.labels.as_slice()))
    }

    pub fn labels(&self, field: &str) -> Option<&[String]> {
        self.categories(field).map(|f| f.labels.as_slice())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fitted code for `label` in `field`.
    pub fn code(&self, field: &str, label: &str) -> Option<i64> {
        self.categories(field)
            .and_then(|f| f.codes.get(label))
            .map(|&code| code as i64)
    }

    fn categories(&self, field: &str) -> Option<&FieldCategories> {
        self.index.get(field).map(|&i| &self.fields[i])
    }

    /// Encode one canonical record into column entries.
    ///
    /// `Missing` produces no entry; the aligner supplies the column default.
    pub fn apply<'a>(&'a self, record: &'a CanonicalRecord) -> EncodedRecord<'a> {
        let mut segment = FeatureSegment::new();
        let mut unseen = Vec::new();

        for (field, value) in record.iter() {
            if let Some(categories) = self.categories(field) {
                let Some(key) = category_key(value) else {
                    continue;
                };
                match categories.codes.get(key.as_ref()) {
                    Some(&code) => match self.strategy {
                        CategoricalEncoding::Ordinal => segment.push(field, code as f64),
                        CategoricalEncoding::OneHot => {
                            segment.push(categories.indicators[code].as_str(), 1.0)
                        }
                    },
                    None => {
                        tracing::debug!(field, label = %key, "unseen category");
                        if self.strategy == CategoricalEncoding::Ordinal {
                            segment.push(field, self.unseen_code as f64);
                        }
                        unseen.push(UnseenCategory {
                            field: field.to_string(),
                            label: key.into_owned(),
                        });
                    }
                }
                continue;
            }

            match value {
                CanonicalValue::Number(n) => segment.push(field, *n),
                CanonicalValue::Marker(Marker::Unknown) => segment.push(field, self.unknown_value),
                CanonicalValue::Marker(Marker::Zero) => segment.push(field, 0.0),
                // Labels of fields the encoder was not fitted on have no column.
                CanonicalValue::Marker(Marker::Missing) | CanonicalValue::Label(_) => {}
            }
        }

        EncodedRecord { segment, unseen }
    }
}

/// Fits an `EncoderState` from canonical rows.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalEncoder {
    strategy: CategoricalEncoding,
    unknown_value: f64,
}

impl Default for CategoricalEncoder {
    fn default() -> Self {
        Self::new(CategoricalEncoding::default())
    }
}

impl CategoricalEncoder {
    pub fn new(strategy: CategoricalEncoding) -> Self {
        Self {
            strategy,
            unknown_value: DEFAULT_UNKNOWN_VALUE,
        }
    }

    pub fn with_unknown_value(mut self, unknown_value: f64) -> Self {
        self.unknown_value = unknown_value;
        self
    }

    /// Collect labels for `fields` in first-seen row order.
    ///
    /// Rows are consumed sequentially so codes are reproducible for a given
    /// row order.
    pub fn fit(&self, fields: &[String], rows: &[CanonicalRecord]) -> EncoderState {
        let mut collected: Vec<(String, Vec<String>)> =
            fields.iter().map(|f| (f.clone(), Vec::new())).collect();
        let mut seen: Vec<std::collections::HashSet<String>> =
            fields.iter().map(|_| Default::default()).collect();

        let mut cursor = FieldCursor::new(fields);
        for row in rows {
            for (slot, position) in cursor.slots(row).iter().enumerate() {
                let Some(key) = position.and_then(|i| category_key(&row.values()[i])) else {
                    continue;
                };
                if !seen[slot].contains(key.as_ref()) {
                    seen[slot].insert(key.to_string());
                    collected[slot].1.push(key.into_owned());
                }
            }
        }

        EncoderState::from_parts(self.strategy, UNSEEN_CODE, self.unknown_value, collected)
    }
}
