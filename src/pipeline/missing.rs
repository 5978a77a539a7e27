//! Marker profiling and high-missing field reduction

use serde::Serialize;

use super::value::{CanonicalRecord, FieldCursor, Marker};

/// Marker counts for one feature field over the kept rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerProfile {
    pub field: String,
    pub rows: usize,
    pub missing: usize,
    pub unknown: usize,
    pub zero: usize,
}

impl MarkerProfile {
    pub fn missing_ratio(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.missing as f64 / self.rows as f64
        }
    }
}

/// Count markers per field, sorted by missing ratio descending.
pub fn profile_markers(fields: &[String], rows: &[CanonicalRecord]) -> Vec<MarkerProfile> {
    let mut profiles: Vec<MarkerProfile> = fields
        .iter()
        .map(|field| MarkerProfile {
            field: field.clone(),
            rows: rows.len(),
            ..Default::default()
        })
        .collect();

    let mut cursor = FieldCursor::new(fields);
    for row in rows {
        for (profile, position) in profiles.iter_mut().zip(cursor.slots(row)) {
            match position.and_then(|i| row.values()[i].marker()) {
                Some(Marker::Missing) => profile.missing += 1,
                Some(Marker::Unknown) => profile.unknown += 1,
                Some(Marker::Zero) => profile.zero += 1,
                None => {}
            }
        }
    }

    profiles.sort_by(|a, b| {
        b.missing_ratio()
            .partial_cmp(&a.missing_ratio())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    profiles
}

/// Fields whose missing ratio exceeds `threshold`.
pub fn fields_above_threshold(profiles: &[MarkerProfile], threshold: f64) -> Vec<String> {
    profiles
        .iter()
        .filter(|p| p.missing_ratio() > threshold)
        .map(|p| p.field.clone())
        .collect()
}
