//! Structured logging schema and field name constants for terrier.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (chunk scoring) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → extraction → sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "db", "geo", "enrich", "match"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "snippet_matcher", "evidence_parser", "http_geocoder", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "find_or_create", "merge", "match_records", "geocode"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Tenant (business) UUID scoping the operation.
pub const TENANT_ID: &str = "tenant_id";

/// Property UUID being operated on.
pub const PROPERTY_ID: &str = "property_id";

/// Source document UUID.
pub const DOCUMENT_ID: &str = "document_id";

/// Document classification type driving merge priority.
pub const DOCUMENT_TYPE: &str = "document_type";

/// SHA-256 address hash (hex, never the raw address).
pub const ADDRESS_HASH: &str = "address_hash";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Best chunk score for a matched evidence record.
pub const SCORE: &str = "score";

/// Number of chunks scored against a snippet or citation context.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of evidence records parsed or matched.
pub const RECORD_COUNT: &str = "record_count";

/// Number of fields written by a merge pass.
pub const FIELD_COUNT: &str = "field_count";

// ─── Geocoding fields ──────────────────────────────────────────────────────

/// Address variation rank attempted (0 = literal address).
pub const VARIATION_RANK: &str = "variation_rank";

/// Geocode status string ("success", "not_found", "error", "empty_address").
pub const GEOCODE_STATUS: &str = "geocode_status";

/// Provider confidence in [0,1].
pub const CONFIDENCE: &str = "confidence";
