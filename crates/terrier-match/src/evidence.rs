//! Evidence block extraction from assistant answers.
//!
//! The answering model is instructed (via [`EVIDENCE_PROMPT`]) to append a
//! delimited JSON block after its natural-language reply, citing the
//! literal source passages behind each factual claim. This module strips
//! that block from the visible answer and parses it into
//! [`EvidenceRecord`]s, tolerating every malformation an LLM can produce:
//! nothing here ever returns an error to the caller.

use tracing::{debug, warn};

use terrier_core::defaults::{EVIDENCE_BLOCK_END, EVIDENCE_BLOCK_START, MAX_SNIPPET_LEN};
use terrier_core::EvidenceRecord;

/// Prompt fragment instructing the answering model to emit the block.
///
/// Kept beside the parser so the delimiters cannot drift.
pub const EVIDENCE_PROMPT: &str = "\
After your answer, append a machine-readable evidence block listing the \
passages your answer relies on. Format it exactly as:\n\
<EVIDENCE_FEEDBACK>[{\"doc_id\": \"<document id>\", \"snippet\": \"<verbatim \
excerpt from the source>\", \"citation_label\": \"<label used in the answer, \
if any>\", \"page_hint\": <page number, if known>}]</EVIDENCE_FEEDBACK>\n\
Only cite passages that literally appear in the provided documents. Omit \
the block entirely if the answer makes no factual claims.";

/// Strip and parse the evidence block from an answer.
///
/// Returns the user-facing answer with the block removed, plus the parsed
/// records. Recovery rules:
///
/// - No start delimiter: text unchanged, no records (the common case for
///   non-factual answers).
/// - Start delimiter but no end delimiter: WARN, text left untouched (the
///   malformed block stays visible rather than silently truncating the
///   answer), no records.
/// - Unparsable JSON or a top-level shape that is neither an object nor an
///   array: block stripped, no records.
/// - A single object coerces to a one-element array.
/// - Records lacking a non-empty `doc_id` or `snippet` are dropped silently.
/// - Surviving snippets are truncated to [`MAX_SNIPPET_LEN`] chars.
pub fn extract(answer: &str) -> (String, Vec<EvidenceRecord>) {
    let Some(start) = answer.find(EVIDENCE_BLOCK_START) else {
        return (answer.to_string(), Vec::new());
    };

    let after_start = start + EVIDENCE_BLOCK_START.len();
    let Some(end_rel) = answer[after_start..].find(EVIDENCE_BLOCK_END) else {
        warn!(
            "evidence block opened without closing delimiter; leaving answer untouched"
        );
        return (answer.to_string(), Vec::new());
    };
    let end = after_start + end_rel;

    let interior = &answer[after_start..end];
    let mut clean = String::with_capacity(answer.len());
    clean.push_str(&answer[..start]);
    clean.push_str(&answer[end + EVIDENCE_BLOCK_END.len()..]);
    let clean = clean.trim().to_string();

    let records = parse_records(interior);
    debug!(record_count = records.len(), "extracted evidence block");
    (clean, records)
}

/// Parse the block interior into validated records. Never errors.
fn parse_records(interior: &str) -> Vec<EvidenceRecord> {
    let value: serde_json::Value = match serde_json::from_str(interior.trim()) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "evidence block JSON unparsable; dropping");
            return Vec::new();
        }
    };

    let items = match value {
        serde_json::Value::Array(items) => items,
        // A single object is coerced to a one-element array
        obj @ serde_json::Value::Object(_) => vec![obj],
        other => {
            warn!(
                shape = other_shape(&other),
                "evidence block has unsupported top-level shape; dropping"
            );
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<EvidenceRecord>(item) {
            Ok(record) => validate(record),
            Err(_) => None,
        })
        .collect()
}

fn other_shape(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Drop records missing required fields; cap snippet length.
fn validate(mut record: EvidenceRecord) -> Option<EvidenceRecord> {
    if record.doc_id.trim().is_empty() || record.snippet.trim().is_empty() {
        return None;
    }
    if record.snippet.chars().count() > MAX_SNIPPET_LEN {
        record.snippet = record.snippet.chars().take(MAX_SNIPPET_LEN).collect();
    }
    Some(record)
}
