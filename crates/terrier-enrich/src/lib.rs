//! # terrier-enrich
//!
//! Multi-document property enrichment: merges each document's extracted
//! facts into one canonical field-set, resolving conflicts by document-type
//! priority and tracking per-field provenance and completeness.

pub mod completeness;
pub mod merger;

pub use completeness::{completeness_score, is_empty_value};
pub use merger::{document_type_priority, merge, merge_into, EnrichedPropertyData};
