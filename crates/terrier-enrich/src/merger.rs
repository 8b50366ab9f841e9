//! Source-priority field merging across a property's documents.
//!
//! Several documents describe the same property with overlapping, partially
//! contradictory facts. The merger resolves conflicts by document-type
//! priority: a valuation report outranks a market appraisal, which outranks
//! a lease, which outranks everything else. A field set by a
//! higher-priority document is never degraded by a lower-priority one, and
//! equal-priority conflicts keep the first writer in input order.

use chrono::Utc;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use terrier_core::defaults::UNLISTED_TYPE_PRIORITY;
use terrier_core::{DocumentExtraction, FieldProvenance, PropertyDetails};

use crate::completeness::{completeness_score, is_empty_value};

/// Merge priority for a document classification type. Lower wins.
pub fn document_type_priority(document_type: &str) -> u8 {
    match document_type {
        "valuation_report" => 1,
        "market_appraisal" => 2,
        "lease_agreement" => 3,
        "other_documents" => 4,
        _ => UNLISTED_TYPE_PRIORITY,
    }
}

/// Result of merging one or more document extractions.
#[derive(Debug, Clone)]
pub struct EnrichedPropertyData {
    /// Winning value per field.
    pub fields: JsonMap<String, JsonValue>,
    /// Which document supplied each winning value.
    pub provenance: HashMap<String, FieldProvenance>,
    /// Every field name any contributing document attempted.
    pub attempted_fields: BTreeSet<String>,
    pub completeness_score: f64,
}

impl EnrichedPropertyData {
    /// Winning value for a field, if any document supplied one.
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name)
    }

    /// Source document info for a field's winning value.
    pub fn provenance_for(&self, name: &str) -> Option<&FieldProvenance> {
        self.provenance.get(name)
    }

    /// Convert into a persistable details record for a property.
    pub fn into_details(self, property_id: uuid::Uuid) -> PropertyDetails {
        PropertyDetails {
            property_id,
            fields: self.fields,
            provenance: self.provenance,
            completeness_score: self.completeness_score,
            updated_at: Utc::now(),
        }
    }
}

/// Merge extracted records into one canonical field-set.
///
/// Records are processed in ascending priority order (stable, so input
/// order breaks ties); each non-empty field is written only if unset.
/// Output is therefore independent of input order across *different*
/// priorities and first-writer-wins within the same priority.
pub fn merge(extractions: &[DocumentExtraction]) -> EnrichedPropertyData {
    merge_with_existing(None, extractions)
}

/// Re-merge new extractions on top of an existing details record.
///
/// Documents arrive over time; the stored provenance carries each held
/// field's source priority, so a newly arrived higher-priority document can
/// overwrite while a lower-priority one cannot.
pub fn merge_into(
    existing: &PropertyDetails,
    extractions: &[DocumentExtraction],
) -> EnrichedPropertyData {
    merge_with_existing(Some(existing), extractions)
}

fn merge_with_existing(
    existing: Option<&PropertyDetails>,
    extractions: &[DocumentExtraction],
) -> EnrichedPropertyData {
    let mut fields = JsonMap::new();
    let mut provenance: HashMap<String, FieldProvenance> = HashMap::new();
    let mut attempted: BTreeSet<String> = BTreeSet::new();

    if let Some(details) = existing {
        fields = details.fields.clone();
        provenance = details.provenance.clone();
        attempted.extend(details.fields.keys().cloned());
    }

    let mut ordered: Vec<&DocumentExtraction> = extractions.iter().collect();
    ordered.sort_by_key(|e| document_type_priority(&e.document_type));

    let mut written = 0usize;
    for extraction in ordered {
        let new_priority = document_type_priority(&extraction.document_type);
        for (name, value) in &extraction.fields {
            attempted.insert(name.clone());
            if is_empty_value(value) {
                continue;
            }

            let overwrite = match provenance.get(name) {
                None => true,
                // Strictly higher priority (lower number) may replace a
                // held value; ties keep the first writer.
                Some(holder) => new_priority < document_type_priority(&holder.document_type),
            };
            if !overwrite {
                continue;
            }

            fields.insert(name.clone(), value.clone());
            provenance.insert(
                name.clone(),
                FieldProvenance {
                    document_type: extraction.document_type.clone(),
                    document_id: extraction.document_id,
                    updated_at: Utc::now(),
                },
            );
            written += 1;
        }
    }

    let completeness_score = completeness_score(&fields, &attempted);
    debug!(
        field_count = written,
        attempted = attempted.len(),
        completeness = completeness_score,
        "merged document extractions"
    );

    EnrichedPropertyData {
        fields,
        provenance,
        attempted_fields: attempted,
        completeness_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn extraction(
        document_type: &str,
        pairs: &[(&str, JsonValue)],
    ) -> DocumentExtraction {
        DocumentExtraction {
            document_id: Uuid::new_v4(),
            document_type: document_type.to_string(),
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_priority_table() {
        assert_eq!(document_type_priority("valuation_report"), 1);
        assert_eq!(document_type_priority("market_appraisal"), 2);
        assert_eq!(document_type_priority("lease_agreement"), 3);
        assert_eq!(document_type_priority("other_documents"), 4);
        assert_eq!(document_type_priority("utility_bill"), 255);
    }

    #[test]
    fn test_higher_priority_wins_regardless_of_input_order() {
        let valuation = extraction("valuation_report", &[("size_sqft", json!(1200))]);
        let other = extraction("other_documents", &[("size_sqft", json!(900))]);

        let forward = merge(&[valuation.clone(), other.clone()]);
        let reversed = merge(&[other, valuation]);

        assert_eq!(forward.fields["size_sqft"], json!(1200));
        assert_eq!(reversed.fields["size_sqft"], json!(1200));
        assert_eq!(
            forward.provenance["size_sqft"].document_type,
            "valuation_report"
        );
    }

    #[test]
    fn test_equal_priority_first_writer_wins() {
        let first = extraction("market_appraisal", &[("bedrooms", json!(3))]);
        let second = extraction("market_appraisal", &[("bedrooms", json!(4))]);

        let merged = merge(&[first.clone(), second]);
        assert_eq!(merged.fields["bedrooms"], json!(3));
        assert_eq!(
            merged.provenance["bedrooms"].document_id,
            first.document_id
        );
    }

    #[test]
    fn test_empty_values_skipped() {
        let valuation = extraction(
            "valuation_report",
            &[("tenure", json!(null)), ("condition", json!(""))],
        );
        let lease = extraction("lease_agreement", &[("tenure", json!("leasehold"))]);

        let merged = merge(&[valuation, lease]);
        // Null from the higher-priority document does not block the lease
        assert_eq!(merged.fields["tenure"], json!("leasehold"));
        assert!(!merged.fields.contains_key("condition"));
        // But both were attempted
        assert!(merged.attempted_fields.contains("condition"));
    }

    #[test]
    fn test_fields_from_multiple_documents_combine() {
        let valuation = extraction(
            "valuation_report",
            &[("market_value", json!(2_400_000)), ("size_sqft", json!(1850))],
        );
        let lease = extraction(
            "lease_agreement",
            &[("tenure", json!("leasehold")), ("size_sqft", json!(1700))],
        );

        let merged = merge(&[lease, valuation]);
        assert_eq!(merged.fields["market_value"], json!(2_400_000));
        assert_eq!(merged.fields["size_sqft"], json!(1850));
        assert_eq!(merged.fields["tenure"], json!("leasehold"));
        assert_eq!(merged.provenance["tenure"].document_type, "lease_agreement");
    }

    #[test]
    fn test_merge_into_respects_stored_provenance() {
        let valuation = extraction("valuation_report", &[("size_sqft", json!(1200))]);
        let details = merge(&[valuation]).into_details(Uuid::new_v4());

        // A lease arriving later cannot degrade the held value
        let lease = extraction("lease_agreement", &[("size_sqft", json!(900))]);
        let remerged = merge_into(&details, &[lease]);
        assert_eq!(remerged.fields["size_sqft"], json!(1200));

        // But it can fill a gap
        let lease2 = extraction("lease_agreement", &[("tenure", json!("freehold"))]);
        let remerged = merge_into(&details, &[lease2]);
        assert_eq!(remerged.fields["tenure"], json!("freehold"));
    }

    #[test]
    fn test_merge_into_allows_higher_priority_overwrite() {
        let other = extraction("other_documents", &[("bathrooms", json!(1))]);
        let details = merge(&[other]).into_details(Uuid::new_v4());

        let valuation = extraction("valuation_report", &[("bathrooms", json!(2))]);
        let remerged = merge_into(&details, &[valuation]);
        assert_eq!(remerged.fields["bathrooms"], json!(2));
        assert_eq!(
            remerged.provenance["bathrooms"].document_type,
            "valuation_report"
        );
    }

    #[test]
    fn test_completeness_rises_with_required_fields() {
        let sparse = merge(&[extraction(
            "other_documents",
            &[("tenure", json!("freehold"))],
        )]);

        let fuller = merge(&[
            extraction("other_documents", &[("tenure", json!("freehold"))]),
            extraction(
                "valuation_report",
                &[
                    ("address", json!("10 downing street london")),
                    ("property_type", json!("terraced")),
                    ("size_sqft", json!(1200)),
                    ("bedrooms", json!(3)),
                    ("bathrooms", json!(2)),
                ],
            ),
        ]);

        assert!(fuller.completeness_score > sparse.completeness_score);
        assert!(fuller.completeness_score >= 0.7);
    }

    #[test]
    fn test_merge_empty_input() {
        let merged = merge(&[]);
        assert!(merged.fields.is_empty());
        assert!(merged.provenance.is_empty());
        assert_eq!(merged.completeness_score, 0.0);
    }
}
