//! # terrier-match
//!
//! Evidence grounding: parses the machine-readable evidence block an
//! answering model appends to its reply, and aligns each claimed snippet
//! (or inline citation context) with the literal source chunk that
//! supports it, recovering pages and bounding boxes for UI highlighting.

pub mod evidence;
pub mod pool;
pub mod snippet;
pub mod tokens;

pub use evidence::{extract, EVIDENCE_PROMPT};
pub use pool::{match_citation_context, score_citation_context, AnswerDocument, EvidencePool};
pub use snippet::{best_chunk, normalize_text, score_chunk, ScoringConfig};
pub use tokens::{
    extract_currency_tokens, extract_number_tokens, extract_year_tokens, has_valuation_vocabulary,
    significant_trailing_words,
};
