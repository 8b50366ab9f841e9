//! Core data models for terrier.
//!
//! These types are shared across all terrier crates and represent the
//! canonical property catalogue and the evidence-grounding pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use uuid::Uuid;

// =============================================================================
// PROPERTY TYPES
// =============================================================================

/// Canonical deduplicated record for one real-world asset.
///
/// Within a tenant there is at most one `Property` per `address_hash`; the
/// storage layer enforces this with a unique constraint on
/// `(tenant_id, address_hash)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    /// Multi-tenancy scope (the owning business).
    pub tenant_id: Uuid,
    /// SHA-256 hex digest of the normalized address. Empty string is the
    /// sentinel for an unhashable address and is never stored.
    pub address_hash: String,
    pub normalized_address: String,
    /// The geocoder's canonical formatted string, when resolution succeeded.
    pub formatted_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// 0..1, recomputed only by the field merger.
    pub completeness_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new property row.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub tenant_id: Uuid,
    pub address_hash: String,
    pub normalized_address: String,
    pub formatted_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Outcome of identity resolution for an extracted address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// An existing property with the same (tenant, hash) was found.
    ExactMatch,
    /// No property existed for this hash; a new one was created.
    NewProperty,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::ExactMatch => "exact_match",
            MatchOutcome::NewProperty => "new_property",
        }
    }
}

/// Enriched, merged field-set for a property. One-to-one with `Property`.
///
/// `fields` is a flat JSON object (property_type, size_sqft, bedrooms,
/// asking_price, tenure, amenities, ...). Mutated exclusively by the field
/// merger; every present field has a provenance entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub property_id: Uuid,
    pub fields: JsonMap<String, JsonValue>,
    pub provenance: HashMap<String, FieldProvenance>,
    pub completeness_score: f64,
    pub updated_at: DateTime<Utc>,
}

/// Where a merged field value came from, for audit and re-merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub document_type: String,
    pub document_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// DOCUMENT TYPES
// =============================================================================

/// How the address that linked a document to a property was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressSource {
    Filename,
    Extraction,
}

impl AddressSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressSource::Filename => "filename",
            AddressSource::Extraction => "extraction",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "filename" => AddressSource::Filename,
            _ => AddressSource::Extraction,
        }
    }
}

/// Many-to-one link from a source document to the property it matched.
///
/// `(document_id, property_id)` is unique at the join level; a document
/// links to at most one property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRelationship {
    pub id: Uuid,
    pub document_id: Uuid,
    pub property_id: Uuid,
    pub relationship_type: String,
    pub address_source: AddressSource,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Fields required to link a document to a property.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub document_id: Uuid,
    pub property_id: Uuid,
    pub relationship_type: String,
    pub address_source: AddressSource,
    pub confidence_score: f64,
}

/// One document's extracted facts about a property, tagged with the
/// classification type that drives merge priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentExtraction {
    pub document_id: Uuid,
    /// Classification type: "valuation_report", "market_appraisal",
    /// "lease_agreement", "other_documents", or anything else (lowest
    /// priority).
    pub document_type: String,
    /// Flat field map as produced by the extraction provider.
    pub fields: JsonMap<String, JsonValue>,
}

// =============================================================================
// CHUNKS AND EVIDENCE
// =============================================================================

/// Page-layout rectangle for UI highlighting, in PDF coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// An indexed unit of a parsed document's text.
///
/// Produced by the external parsing pipeline; read-only input here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_index: i32,
    pub page_number: Option<i32>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    /// Flagged by the parser when the chunk sits in a valuation section.
    #[serde(default)]
    pub valuation_priority: bool,
    /// Additive scoring hint from the parser for price-bearing chunks.
    #[serde(default)]
    pub price_boost: f32,
}

impl Chunk {
    /// Minimal chunk with only content, for tests and plain-text pools.
    pub fn from_content(chunk_index: i32, content: impl Into<String>) -> Self {
        Self {
            chunk_index,
            page_number: None,
            content: content.into(),
            bbox: None,
            valuation_priority: false,
            price_boost: 0.0,
        }
    }
}

/// One claimed fact parsed out of an answer's evidence block.
///
/// Ephemeral: exists only for one answer-processing cycle and is consumed
/// immediately by the snippet matcher, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Document reference as emitted by the model. May be a real id or a
    /// 1-based ordinal label like "1".
    pub doc_id: String,
    /// Verbatim excerpt supporting the claim, capped at
    /// [`crate::defaults::MAX_SNIPPET_LEN`] chars by the parser.
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_hint: Option<i32>,
}

/// An evidence record paired with the best source chunk found, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedEvidence {
    pub record: EvidenceRecord,
    /// Resolved document id, when doc_id resolution succeeded.
    pub document_id: Option<Uuid>,
    /// Best chunk clearing the acceptance threshold, or None for no-match.
    pub chunk: Option<Chunk>,
    pub score: f32,
}

/// Mapping from a citation label to its source location, for UI highlighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationHighlight {
    pub label: String,
    pub document_id: Uuid,
    pub chunk_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

// =============================================================================
// GEOCODING
// =============================================================================

/// Resolution status from the geocoding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeStatus {
    Success,
    NotFound,
    Error,
    EmptyAddress,
}

impl GeocodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeocodeStatus::Success => "success",
            GeocodeStatus::NotFound => "not_found",
            GeocodeStatus::Error => "error",
            GeocodeStatus::EmptyAddress => "empty_address",
        }
    }
}

/// One geocoding attempt's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub status: GeocodeStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Provider confidence in [0,1]; 0.0 for non-success statuses.
    pub confidence: f64,
    pub formatted_address: Option<String>,
}

impl GeocodeResult {
    /// A degraded result carrying no coordinates.
    pub fn unresolved(status: GeocodeStatus) -> Self {
        Self {
            status,
            latitude: None,
            longitude: None,
            confidence: 0.0,
            formatted_address: None,
        }
    }
}

/// Fully resolved address: normalization, hash, and geocoding outcome.
///
/// Produced by the variation-retry pipeline in terrier-geo and consumed by
/// identity resolution. Always present even when geocoding failed; a failed
/// geocode carries `GeocodeStatus::NotFound`/`Error` with null coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub raw: String,
    pub normalized: String,
    pub address_hash: String,
    pub geocode: GeocodeResult,
    /// The address variation string that actually resolved (or the last one
    /// attempted on failure).
    pub attempted_variation: String,
    /// 0 = the literal address resolved; higher ranks are sparser fallback
    /// variations and carry discounted confidence.
    pub variation_rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_outcome_as_str() {
        assert_eq!(MatchOutcome::ExactMatch.as_str(), "exact_match");
        assert_eq!(MatchOutcome::NewProperty.as_str(), "new_property");
    }

    #[test]
    fn test_match_outcome_serde_snake_case() {
        let json = serde_json::to_string(&MatchOutcome::NewProperty).unwrap();
        assert_eq!(json, "\"new_property\"");
    }

    #[test]
    fn test_address_source_roundtrip() {
        assert_eq!(
            AddressSource::from_str_loose(AddressSource::Filename.as_str()),
            AddressSource::Filename
        );
        assert_eq!(
            AddressSource::from_str_loose("extraction"),
            AddressSource::Extraction
        );
        // Unknown values default to extraction (the common path)
        assert_eq!(
            AddressSource::from_str_loose("???"),
            AddressSource::Extraction
        );
    }

    #[test]
    fn test_chunk_from_content_defaults() {
        let chunk = Chunk::from_content(3, "Market value: £500,000");
        assert_eq!(chunk.chunk_index, 3);
        assert!(chunk.page_number.is_none());
        assert!(chunk.bbox.is_none());
        assert!(!chunk.valuation_priority);
        assert_eq!(chunk.price_boost, 0.0);
    }

    #[test]
    fn test_chunk_deserializes_without_quality_flags() {
        let json = r#"{"chunk_index":0,"page_number":2,"content":"hello"}"#;
        let chunk: Chunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.page_number, Some(2));
        assert!(!chunk.valuation_priority);
        assert_eq!(chunk.price_boost, 0.0);
    }

    #[test]
    fn test_evidence_record_optional_fields_default() {
        let json = r#"{"doc_id":"1","snippet":"£2,400,000 paid"}"#;
        let record: EvidenceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.doc_id, "1");
        assert!(record.citation_label.is_none());
        assert!(record.rationale.is_none());
        assert!(record.page_hint.is_none());
    }

    #[test]
    fn test_geocode_unresolved_has_no_coordinates() {
        let result = GeocodeResult::unresolved(GeocodeStatus::NotFound);
        assert_eq!(result.status, GeocodeStatus::NotFound);
        assert!(result.latitude.is_none());
        assert!(result.longitude.is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_geocode_status_as_str() {
        assert_eq!(GeocodeStatus::Success.as_str(), "success");
        assert_eq!(GeocodeStatus::NotFound.as_str(), "not_found");
        assert_eq!(GeocodeStatus::Error.as_str(), "error");
        assert_eq!(GeocodeStatus::EmptyAddress.as_str(), "empty_address");
    }
}
