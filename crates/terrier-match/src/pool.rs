//! Per-answer evidence pool: the chunk context an answer was generated
//! over, and the matching operations against it.
//!
//! One [`EvidencePool`] is built per answer-processing cycle from the
//! ordered list of documents the answer drew on, used to align that
//! answer's evidence records and inline citations, and dropped when the
//! cycle ends. Constructing it per answer keeps the document ordering that
//! ordinal doc_id resolution depends on explicit and lifetime-scoped,
//! rather than hanging off process-global state.

use std::str::FromStr;
use tracing::{debug, trace};
use uuid::Uuid;

use terrier_core::{Chunk, CitationHighlight, EvidenceRecord, MatchedEvidence};

use crate::snippet::{acceptance_threshold, score_chunk, ScoringConfig};
use crate::tokens::{extract_number_tokens, extract_year_tokens, significant_trailing_words};

/// One source document's chunk pool, in answer order.
#[derive(Debug, Clone)]
pub struct AnswerDocument {
    pub document_id: Uuid,
    pub chunks: Vec<Chunk>,
}

/// How many trailing context words feed citation-context matching.
const CITATION_CONTEXT_WORDS: usize = 6;

/// The chunk context assembled for one answered question.
#[derive(Debug, Clone)]
pub struct EvidencePool {
    documents: Vec<AnswerDocument>,
    config: ScoringConfig,
}

impl EvidencePool {
    /// Build a pool over the documents the answer was generated from, in
    /// the order they were presented to the model.
    pub fn new(documents: Vec<AnswerDocument>) -> Self {
        Self::with_config(documents, ScoringConfig::default())
    }

    pub fn with_config(documents: Vec<AnswerDocument>, config: ScoringConfig) -> Self {
        Self { documents, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Resolve a model-emitted doc_id to a pool document.
    ///
    /// Exact id lookup first; failing that, the id is treated as a 1-based
    /// ordinal into the answer's document list (models frequently echo
    /// "[1]"-style labels instead of real ids). Ordinal resolution is
    /// logged. Resolution order is a known ambiguity: a literal id of "1"
    /// in an integer id scheme would shadow the ordinal path.
    fn resolve_doc(&self, doc_id: &str) -> Option<usize> {
        let trimmed = doc_id.trim().trim_matches(|c| c == '[' || c == ']');

        if let Ok(id) = Uuid::from_str(trimmed) {
            if let Some(pos) = self.documents.iter().position(|d| d.document_id == id) {
                return Some(pos);
            }
        }

        let ordinal: usize = trimmed.parse().ok()?;
        if ordinal >= 1 && ordinal <= self.documents.len() {
            debug!(
                doc_id = trimmed,
                resolved = %self.documents[ordinal - 1].document_id,
                "resolved ordinal doc_id"
            );
            return Some(ordinal - 1);
        }
        None
    }

    /// Align each evidence record with its best source chunk.
    ///
    /// Per-record independent and deterministic: a score tie always keeps
    /// the first chunk in pool order, regardless of evaluation order. A
    /// record whose doc_id cannot be resolved, or whose best chunk falls
    /// below the acceptance threshold, comes back with `chunk: None`.
    /// Successful ordinal resolution rewrites the record's doc_id in place.
    pub fn match_records(&self, records: Vec<EvidenceRecord>) -> Vec<MatchedEvidence> {
        let matched: Vec<MatchedEvidence> = records
            .into_iter()
            .map(|record| self.match_record(record))
            .collect();
        debug!(
            record_count = matched.len(),
            matched_count = matched.iter().filter(|m| m.chunk.is_some()).count(),
            "matched evidence records"
        );
        matched
    }

    fn match_record(&self, mut record: EvidenceRecord) -> MatchedEvidence {
        let Some(doc_pos) = self.resolve_doc(&record.doc_id) else {
            trace!(doc_id = %record.doc_id, "doc_id unresolvable; no match");
            return MatchedEvidence {
                record,
                document_id: None,
                chunk: None,
                score: 0.0,
            };
        };

        let document = &self.documents[doc_pos];
        record.doc_id = document.document_id.to_string();

        let mut best: Option<(&Chunk, f32)> = None;
        for chunk in &document.chunks {
            let mut score = score_chunk(&record.snippet, chunk, &self.config);
            if let (Some(hint), Some(page)) = (record.page_hint, chunk.page_number) {
                if hint == page {
                    score += self.config.page_bonus;
                }
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((chunk, score));
            }
        }

        match best {
            Some((chunk, score))
                if score >= acceptance_threshold(&record.snippet, chunk, &self.config) =>
            {
                MatchedEvidence {
                    document_id: Some(document.document_id),
                    chunk: Some(chunk.clone()),
                    score,
                    record,
                }
            }
            _ => MatchedEvidence {
                record,
                document_id: Some(document.document_id),
                chunk: None,
                score: best.map(|(_, s)| s).unwrap_or(0.0),
            },
        }
    }

    /// Align the plain-text span preceding an inline citation marker with
    /// its source chunk, searching every document in the pool.
    pub fn match_citation(&self, context_text: &str) -> Option<(Uuid, &Chunk)> {
        let mut best: Option<(Uuid, &Chunk, f32)> = None;
        for document in &self.documents {
            for chunk in &document.chunks {
                let score = score_citation_context(context_text, chunk, &self.config);
                if best.map_or(true, |(_, _, best_score)| score > best_score) {
                    best = Some((document.document_id, chunk, score));
                }
            }
        }

        let (document_id, chunk, score) = best?;
        if score < acceptance_threshold(context_text, chunk, &self.config) {
            return None;
        }
        Some((document_id, chunk))
    }

    /// Build the label → source-location mappings the UI highlights from.
    pub fn highlights(matches: &[MatchedEvidence]) -> Vec<CitationHighlight> {
        matches
            .iter()
            .filter_map(|m| {
                let chunk = m.chunk.as_ref()?;
                let document_id = m.document_id?;
                Some(CitationHighlight {
                    label: m
                        .record
                        .citation_label
                        .clone()
                        .unwrap_or_else(|| m.record.doc_id.clone()),
                    document_id,
                    chunk_index: chunk.chunk_index,
                    page_number: chunk.page_number,
                    bbox: chunk.bbox,
                })
            })
            .collect()
    }
}

/// Score a chunk against the free-text context before a citation marker.
///
/// The snippet machinery plus three context-specific signals: significant
/// trailing words (the words nearest the marker carry the claim), the
/// chunk's page number appearing among the context's number tokens, and a
/// shared four-digit year (dates anchor claims about sales and surveys).
pub fn score_citation_context(context: &str, chunk: &Chunk, config: &ScoringConfig) -> f32 {
    let mut score = score_chunk(context, chunk, config);

    let chunk_lower = chunk.content.to_lowercase();
    for word in significant_trailing_words(context, CITATION_CONTEXT_WORDS) {
        if chunk_lower.contains(&word) {
            score += config.trailing_word_bonus;
        }
    }

    if let Some(page) = chunk.page_number {
        if extract_number_tokens(context).contains(&page.to_string()) {
            score += config.page_bonus;
        }
    }

    let context_years = extract_year_tokens(context);
    if !context_years.is_empty()
        && !context_years.is_disjoint(&extract_year_tokens(&chunk.content))
    {
        score += config.year_bonus;
    }

    score
}

/// Align a citation context against a standalone chunk pool.
///
/// Same machinery as [`EvidencePool::match_citation`] for callers that
/// already hold one document's chunks.
pub fn match_citation_context<'a>(
    context_text: &str,
    chunks: &'a [Chunk],
    config: &ScoringConfig,
) -> Option<&'a Chunk> {
    let mut best: Option<(&Chunk, f32)> = None;
    for chunk in chunks {
        let score = score_citation_context(context_text, chunk, config);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((chunk, score));
        }
    }
    let (chunk, score) = best?;
    if score < acceptance_threshold(context_text, chunk, config) {
        return None;
    }
    Some(chunk)
}
