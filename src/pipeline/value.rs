//! Raw and canonical value model

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Tokens treated the same as an empty cell.
const BLANK_TOKENS: [&str; 4] = ["na", "nan", "null", "none"];

/// A raw survey value as originally captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Parse a cell token. Blank and null-like tokens return `None`.
    pub fn parse(token: &str) -> Option<RawValue> {
        let token = token.trim();
        if token.is_empty() || BLANK_TOKENS.iter().any(|b| token.eq_ignore_ascii_case(b)) {
            return None;
        }
        if let Ok(i) = token.parse::<i64>() {
            return Some(RawValue::Int(i));
        }
        match token.parse::<f64>() {
            Ok(f) if f.is_finite() => Some(RawValue::Float(f)),
            _ => Some(RawValue::Text(token.to_string())),
        }
    }

    /// Interpret the value as an integer code.
    ///
    /// Floats qualify only when integral (`205.0`), since CSV exports of
    /// nullable integer columns write codes that way.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            RawValue::Int(i) => Some(*i),
            RawValue::Float(f) => float_to_code(*f),
            RawValue::Text(s) => match RawValue::parse(s)? {
                RawValue::Int(i) => Some(i),
                RawValue::Float(f) => float_to_code(f),
                RawValue::Text(_) => None,
            },
        }
    }

    /// Interpret the value as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Int(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            RawValue::Text(s) => match RawValue::parse(s)? {
                RawValue::Int(i) => Some(i as f64),
                RawValue::Float(f) => Some(f),
                RawValue::Text(_) => None,
            },
        }
    }

    /// The text token, when the value is not numeric.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) if self.as_number().is_none() => Some(s.as_str()),
            _ => None,
        }
    }
}

fn float_to_code(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(i) => write!(f, "{}", i),
            RawValue::Float(v) => write!(f, "{}", v),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One respondent or one user submission. Absent fields are not stored.
///
/// Field names are `Arc<str>` so rows read from one file share the header's
/// allocations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "BTreeMap<String, Option<RawValue>>")]
pub struct RawRecord {
    values: BTreeMap<Arc<str>, RawValue>,
}

impl From<BTreeMap<String, Option<RawValue>>> for RawRecord {
    fn from(map: BTreeMap<String, Option<RawValue>>) -> Self {
        let values = map
            .into_iter()
            .filter_map(|(field, value)| {
                let value = match value? {
                    RawValue::Text(s) => RawValue::parse(&s)?,
                    other => other,
                };
                Some((Arc::from(field), value))
            })
            .collect();
        Self { values }
    }
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(field, token)` pairs; blank tokens are skipped.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut record = Self::new();
        for (field, token) in pairs {
            record.set(field, token);
        }
        record
    }

    pub fn insert(&mut self, field: impl Into<Arc<str>>, value: RawValue) {
        self.values.insert(field.into(), value);
    }

    /// Parse `token` and store it; a blank token removes the field.
    pub fn set(&mut self, field: &str, token: &str) {
        match RawValue::parse(token) {
            Some(value) => {
                self.values.insert(Arc::from(field), value);
            }
            None => {
                self.values.remove(field);
            }
        }
    }

    /// Like `set`, reusing an already allocated field name.
    pub fn set_shared(&mut self, field: &Arc<str>, token: &str) {
        match RawValue::parse(token) {
            Some(value) => {
                self.values.insert(Arc::clone(field), value);
            }
            None => {
                self.values.remove(&**field);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.values.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| &**k)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A tabular batch of raw records with the header order of its source.
///
/// `columns` is the full header, including columns whose values were not
/// kept in `rows`.
#[derive(Debug, Clone, Default)]
pub struct RawCorpus {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawCorpus {
    pub fn new(columns: Vec<String>, rows: Vec<RawRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Canonical non-value states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// Don't know, refused, or a code with no meaning for the field.
    Unknown,
    /// Explicit none/never.
    Zero,
    /// Blank or absent.
    Missing,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Unknown => write!(f, "Unknown"),
            Marker::Zero => write!(f, "Zero"),
            Marker::Missing => write!(f, "Missing"),
        }
    }
}

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalValue {
    Number(f64),
    Label(String),
    Marker(Marker),
}

impl CanonicalValue {
    pub const MISSING: CanonicalValue = CanonicalValue::Marker(Marker::Missing);

    pub fn marker(&self) -> Option<Marker> {
        match self {
            CanonicalValue::Marker(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CanonicalValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            CanonicalValue::Label(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CanonicalValue::Marker(Marker::Missing))
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Number(n) => write!(f, "{}", n),
            CanonicalValue::Label(s) => write!(f, "{}", s),
            CanonicalValue::Marker(m) => write!(f, "<{}>", m),
        }
    }
}

/// Ordered feature field names with a position index, shared by every
/// `CanonicalRecord` normalized against the same registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldLayout {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FieldLayout {
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for FieldLayout {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Normalized values for every feature field of a registry, in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    layout: Arc<FieldLayout>,
    values: Vec<CanonicalValue>,
}

impl CanonicalRecord {
    pub(crate) fn new(layout: Arc<FieldLayout>, values: Vec<CanonicalValue>) -> Self {
        debug_assert_eq!(layout.len(), values.len());
        Self { layout, values }
    }

    pub fn get(&self, field: &str) -> Option<&CanonicalValue> {
        self.layout.position(field).map(|idx| &self.values[idx])
    }

    pub fn layout(&self) -> &Arc<FieldLayout> {
        &self.layout
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonicalValue)> {
        self.layout.names.iter().map(|f| f.as_str()).zip(self.values.iter())
    }

    pub fn values(&self) -> &[CanonicalValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolves a fixed field list to record positions once per layout.
///
/// Rows normalized by one registry share a layout, so a pass over a corpus
/// resolves names a single time.
pub(crate) struct FieldCursor<'a> {
    fields: &'a [String],
    layout: Option<Arc<FieldLayout>>,
    slots: Vec<Option<usize>>,
}

impl<'a> FieldCursor<'a> {
    pub(crate) fn new(fields: &'a [String]) -> Self {
        Self {
            fields,
            layout: None,
            slots: Vec::with_capacity(fields.len()),
        }
    }

    /// Position of each field in `record`, in field order.
    pub(crate) fn slots(&mut self, record: &CanonicalRecord) -> &[Option<usize>] {
        let stale = !self
            .layout
            .as_ref()
            .is_some_and(|layout| Arc::ptr_eq(layout, &record.layout));
        if stale {
            self.slots.clear();
            self.slots
                .extend(self.fields.iter().map(|f| record.layout.position(f)));
            self.layout = Some(Arc::clone(&record.layout));
        }
        &self.slots
    }
}
