//! Sentinel resolution
//!
//! Survey fields reserve codes such as 7/9, 77/99 or 777/999 for "don't know"
//! or "refused", and 8/88/888 for "none". These are checked before any band
//! dispatch so a sentinel always wins over an overlapping range.

use super::rules::FieldRule;
use super::value::{Marker, RawValue};

/// Marker for `raw` under `rule`, or `None` when ordinary decoding applies.
pub fn resolve(rule: &FieldRule, raw: Option<&RawValue>) -> Option<Marker> {
    match raw {
        None => Some(rule.blank),
        Some(value) => value.as_code().and_then(|code| rule.sentinel_for(code)),
    }
}

/// Every sentinel code declared by `rule`, sorted.
pub fn sentinel_closure(rule: &FieldRule) -> Vec<i64> {
    let mut codes: Vec<i64> = rule.sentinel_codes().collect();
    codes.sort_unstable();
    codes.dedup();
    codes
}
