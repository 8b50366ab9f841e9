//! Completeness scoring for merged property records.
//!
//! A property is "complete" when the fields an agent needs to describe it
//! are present. The score weights a fixed required-field set heavily and
//! rewards optional coverage with the remainder:
//!
//! `score = 0.7 × required_present/required_total
//!        + 0.3 × present/attempted`
//!
//! where "attempted" is every field name any source document tried to
//! supply, present or not.

use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeSet;

use terrier_core::defaults::{
    COMPLETENESS_OPTIONAL_WEIGHT, COMPLETENESS_REQUIRED_WEIGHT, REQUIRED_FIELDS,
};

/// Whether a JSON value carries usable information.
///
/// Null, blank strings, and empty arrays/objects do not count as present;
/// `false` and `0` do.
pub fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Compute the completeness score for a merged field-set.
///
/// `attempted` is the union of field names seen across all contributing
/// extractions. Always in [0,1]; a record satisfying every required field
/// scores at least 0.7 regardless of optional coverage.
pub fn completeness_score(
    fields: &JsonMap<String, JsonValue>,
    attempted: &BTreeSet<String>,
) -> f64 {
    let present: Vec<&String> = fields
        .iter()
        .filter(|(_, v)| !is_empty_value(v))
        .map(|(k, _)| k)
        .collect();

    let required_present = REQUIRED_FIELDS
        .iter()
        .filter(|name| present.iter().any(|k| k.as_str() == **name))
        .count();
    let required_fraction = required_present as f64 / REQUIRED_FIELDS.len() as f64;

    let optional_fraction = if attempted.is_empty() {
        0.0
    } else {
        present.len() as f64 / attempted.len() as f64
    };

    (COMPLETENESS_REQUIRED_WEIGHT * required_fraction
        + COMPLETENESS_OPTIONAL_WEIGHT * optional_fraction)
        .clamp(0.0, 1.0)
}
