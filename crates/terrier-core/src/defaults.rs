//! Centralized default constants for the terrier system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers; scoring weights live on `ScoringConfig` in terrier-match
//! and only their defaults are anchored here.

// =============================================================================
// EVIDENCE
// =============================================================================

/// Maximum retained snippet length in characters.
///
/// Bounds later scoring cost and storage size; the parser truncates longer
/// snippets on a char boundary.
pub const MAX_SNIPPET_LEN: usize = 500;

/// Opening delimiter of the machine-readable evidence block.
pub const EVIDENCE_BLOCK_START: &str = "<EVIDENCE_FEEDBACK>";

/// Closing delimiter of the machine-readable evidence block.
pub const EVIDENCE_BLOCK_END: &str = "</EVIDENCE_FEEDBACK>";

// =============================================================================
// GEOCODING
// =============================================================================

/// Default geocoding provider endpoint.
pub const GEOCODER_URL: &str = "http://localhost:8085/geocode";

/// Timeout for a single geocoding request (seconds). Short on purpose: the
/// pipeline retries across variations and must not block enrichment.
pub const GEOCODE_TIMEOUT_SECS: u64 = 10;

/// Maximum address variations attempted before degrading to not_found.
pub const MAX_GEOCODE_VARIATIONS: usize = 4;

/// Multiplicative confidence discount applied per variation rank beyond the
/// literal address (rank 0). A postcode-only fallback hit is weaker evidence
/// of identity than a full-address hit.
pub const VARIATION_CONFIDENCE_DECAY: f64 = 0.85;

// =============================================================================
// MERGING
// =============================================================================

/// Weight of the required-field fraction in the completeness score.
pub const COMPLETENESS_REQUIRED_WEIGHT: f64 = 0.7;

/// Weight of the present-of-attempted fraction in the completeness score.
pub const COMPLETENESS_OPTIONAL_WEIGHT: f64 = 0.3;

/// Fields a property record must carry to be considered complete.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "address",
    "property_type",
    "size_sqft",
    "bedrooms",
    "bathrooms",
];

/// Priority assigned to document types absent from the priority table.
/// Lower number wins on merge conflicts.
pub const UNLISTED_TYPE_PRIORITY: u8 = 255;

/// Read an environment variable as u64, falling back to a default.
pub fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Read an environment variable as a string, falling back to a default.
pub fn env_str(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
