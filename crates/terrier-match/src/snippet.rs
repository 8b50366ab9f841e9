//! Snippet-to-chunk scoring.
//!
//! Scores a claimed snippet against candidate source chunks by stacking
//! independent signals: literal containment, fuzzy word-sequence
//! similarity, layout metadata, currency-token overlap, valuation
//! vocabulary, and parser-supplied boosts. The weights are empirically
//! tuned, not derived; they live on [`ScoringConfig`] so deployments can
//! retune without code changes.

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use tracing::trace;

use terrier_core::Chunk;

use crate::tokens::{extract_currency_tokens, has_valuation_vocabulary};

/// Tunable scoring weights and thresholds.
///
/// All bonuses are additive. `base_threshold` gates acceptance after the
/// best chunk is selected; `relaxed_threshold` replaces it when both the
/// snippet and the winning chunk carry currency-or-valuation vocabulary,
/// where a moderate textual overlap is still meaningful evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Flat bonus when the normalized snippet is a literal substring of the
    /// normalized chunk.
    pub substring_bonus: f32,
    /// Multiplier on the word-level fuzzy similarity ratio (always
    /// computed, even on exact matches, as a baseline signal).
    pub fuzzy_weight: f32,
    /// Bonus when the chunk carries layout metadata (bbox present).
    pub bbox_bonus: f32,
    /// Bonus when snippet and chunk share at least one identical
    /// currency token.
    pub currency_exact_bonus: f32,
    /// Bonus when both sides carry currency tokens that do not intersect.
    pub currency_partial_bonus: f32,
    /// Bonus when only one side carries a currency token.
    pub currency_single_bonus: f32,
    /// Bonus when both sides carry valuation vocabulary and the chunk is
    /// flagged `valuation_priority`.
    pub valuation_keyword_bonus: f32,
    /// Per-word bonus for significant trailing context words found in the
    /// chunk (citation-context matching only).
    pub trailing_word_bonus: f32,
    /// Bonus when the chunk's page number appears among the context's
    /// number tokens (citation-context matching only).
    pub page_bonus: f32,
    /// Bonus when context and chunk share a four-digit year
    /// (citation-context matching only).
    pub year_bonus: f32,
    /// Minimum best-chunk score for a match to be accepted.
    pub base_threshold: f32,
    /// Acceptance threshold when both sides exhibit currency-or-valuation
    /// vocabulary.
    pub relaxed_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            substring_bonus: 3.0,
            fuzzy_weight: 1.0,
            bbox_bonus: 0.3,
            currency_exact_bonus: 2.5,
            currency_partial_bonus: 0.5,
            currency_single_bonus: 0.1,
            valuation_keyword_bonus: 0.8,
            trailing_word_bonus: 0.2,
            page_bonus: 0.5,
            year_bonus: 0.3,
            base_threshold: 1.0,
            relaxed_threshold: 0.45,
        }
    }
}

/// Lowercase and collapse whitespace for containment and fuzzy comparison.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Score one candidate chunk against a snippet. Additive; see module docs.
pub fn score_chunk(snippet: &str, chunk: &Chunk, config: &ScoringConfig) -> f32 {
    let normalized_snippet = normalize_text(snippet);
    let normalized_chunk = normalize_text(&chunk.content);

    let mut score = 0.0f32;

    if !normalized_snippet.is_empty() && normalized_chunk.contains(&normalized_snippet) {
        score += config.substring_bonus;
    }

    // Baseline word-sequence similarity, computed even on exact matches
    let fuzzy = TextDiff::from_words(normalized_snippet.as_str(), normalized_chunk.as_str())
        .ratio();
    score += fuzzy * config.fuzzy_weight;

    if chunk.bbox.is_some() {
        score += config.bbox_bonus;
    }

    let snippet_currency = extract_currency_tokens(snippet);
    let chunk_currency = extract_currency_tokens(&chunk.content);
    let shared = snippet_currency.intersection(&chunk_currency).count();
    if shared > 0 {
        score += config.currency_exact_bonus;
    } else if !snippet_currency.is_empty() && !chunk_currency.is_empty() {
        score += config.currency_partial_bonus;
    } else if !snippet_currency.is_empty() || !chunk_currency.is_empty() {
        score += config.currency_single_bonus;
    }

    if chunk.valuation_priority
        && has_valuation_vocabulary(snippet)
        && has_valuation_vocabulary(&chunk.content)
    {
        score += config.valuation_keyword_bonus;
    }

    score += chunk.price_boost;

    trace!(
        chunk_index = chunk.chunk_index,
        score,
        fuzzy,
        shared_currency = shared,
        "scored chunk"
    );
    score
}

/// Select the best-scoring chunk for a snippet, applying the acceptance
/// threshold after selection.
///
/// Ties keep the first chunk encountered, so the result is deterministic
/// given stable input order. Returns `None` when no chunk clears the
/// threshold — a valid, expected outcome, not an error.
pub fn best_chunk<'a>(
    snippet: &str,
    chunks: &'a [Chunk],
    config: &ScoringConfig,
) -> Option<(&'a Chunk, f32)> {
    let mut best: Option<(&Chunk, f32)> = None;
    for chunk in chunks {
        let score = score_chunk(snippet, chunk, config);
        // Strict comparison keeps the first chunk on ties
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((chunk, score));
        }
    }

    let (chunk, score) = best?;
    if score < acceptance_threshold(snippet, chunk, config) {
        return None;
    }
    Some((chunk, score))
}

/// Threshold for a candidate pairing. Lowered when both sides exhibit
/// currency-or-valuation vocabulary: such content is rarer, so moderate
/// overlap is still meaningful evidence.
pub fn acceptance_threshold(snippet: &str, chunk: &Chunk, config: &ScoringConfig) -> f32 {
    let snippet_monetary =
        !extract_currency_tokens(snippet).is_empty() || has_valuation_vocabulary(snippet);
    let chunk_monetary = !extract_currency_tokens(&chunk.content).is_empty()
        || has_valuation_vocabulary(&chunk.content);
    if snippet_monetary && chunk_monetary {
        config.relaxed_threshold
    } else {
        config.base_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrier_core::BoundingBox;

    fn chunk(index: i32, content: &str) -> Chunk {
        Chunk::from_content(index, content)
    }

    #[test]
    fn test_exact_substring_with_currency_wins() {
        let chunks = vec![
            chunk(0, "Sale price was £2,000,000 in 2022"),
            chunk(1, "£2,400,000 was paid for the property"),
        ];
        let (best, score) =
            best_chunk("£2,400,000 was paid", &chunks, &ScoringConfig::default())
                .expect("should match");
        assert_eq!(best.chunk_index, 1);
        // substring + exact currency intersection dominate
        assert!(score > 5.0, "score was {score}");
    }

    #[test]
    fn test_unrelated_snippet_yields_no_match() {
        let chunks = vec![
            chunk(0, "The roof was re-tiled following storm damage"),
            chunk(1, "Access is via a shared gravel driveway"),
        ];
        let result = best_chunk(
            "quarterly dividend policy of the fund",
            &chunks,
            &ScoringConfig::default(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_chunk_list_yields_no_match() {
        let result = best_chunk("anything", &[], &ScoringConfig::default());
        assert!(result.is_none());
    }

    #[test]
    fn test_tie_keeps_first_chunk() {
        let chunks = vec![
            chunk(0, "£2,400,000 was paid for the property"),
            chunk(1, "£2,400,000 was paid for the property"),
        ];
        let (best, _) =
            best_chunk("£2,400,000 was paid", &chunks, &ScoringConfig::default())
                .expect("should match");
        assert_eq!(best.chunk_index, 0);
    }

    #[test]
    fn test_bbox_bonus_applied() {
        let config = ScoringConfig::default();
        let plain = chunk(0, "£2,400,000 was paid for the property");
        let mut with_bbox = plain.clone();
        with_bbox.bbox = Some(BoundingBox {
            x0: 10.0,
            y0: 20.0,
            x1: 400.0,
            y1: 40.0,
        });

        let snippet = "£2,400,000 was paid";
        let base = score_chunk(snippet, &plain, &config);
        let boosted = score_chunk(snippet, &with_bbox, &config);
        assert!((boosted - base - config.bbox_bonus).abs() < 1e-6);
    }

    #[test]
    fn test_currency_partial_vs_exact() {
        let config = ScoringConfig::default();
        let exact = chunk(0, "paid £2,400,000 at completion");
        let partial = chunk(1, "paid £1,900,000 at completion");

        let snippet = "£2,400,000 consideration";
        let exact_score = score_chunk(snippet, &exact, &config);
        let partial_score = score_chunk(snippet, &partial, &config);
        assert!(exact_score > partial_score);
        assert!(
            partial_score - score_chunk("consideration", &chunk(2, "paid at completion"), &config)
                >= config.currency_partial_bonus - config.currency_single_bonus
        );
    }

    #[test]
    fn test_valuation_bonus_requires_flag_and_both_sides() {
        let config = ScoringConfig::default();
        let snippet = "the market value was assessed";

        let mut flagged = chunk(0, "Market Value: £750,000 as at the inspection date");
        flagged.valuation_priority = true;
        let unflagged = chunk(1, "Market Value: £750,000 as at the inspection date");

        let flagged_score = score_chunk(snippet, &flagged, &config);
        let unflagged_score = score_chunk(snippet, &unflagged, &config);
        assert!(
            (flagged_score - unflagged_score - config.valuation_keyword_bonus).abs() < 1e-6
        );
    }

    #[test]
    fn test_price_boost_additive() {
        let config = ScoringConfig::default();
        let plain = chunk(0, "guide price applies");
        let mut boosted = plain.clone();
        boosted.price_boost = 0.4;

        let snippet = "guide price";
        let diff = score_chunk(snippet, &boosted, &config) - score_chunk(snippet, &plain, &config);
        assert!((diff - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_relaxed_threshold_for_monetary_content() {
        let config = ScoringConfig::default();
        let monetary = chunk(0, "completion price £900,000 recorded");
        let plain = chunk(1, "three reception rooms downstairs");

        assert_eq!(
            acceptance_threshold("£900,000 approx", &monetary, &config),
            config.relaxed_threshold
        );
        assert_eq!(
            acceptance_threshold("three reception rooms", &plain, &config),
            config.base_threshold
        );
    }

    #[test]
    fn test_moderate_currency_overlap_clears_relaxed_threshold() {
        // Different surface text but the same figure: fuzzy alone would
        // fail the base threshold, the currency intersection carries it.
        let chunks = vec![chunk(
            0,
            "The consideration stated in the transfer deed is £900,000.",
        )];
        let result = best_chunk("£900,000", &chunks, &ScoringConfig::default());
        assert!(result.is_some());
    }

    #[test]
    fn test_scoring_config_serde_roundtrip() {
        let config = ScoringConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ScoringConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.substring_bonus, config.substring_bonus);
        assert_eq!(back.relaxed_threshold, config.relaxed_threshold);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("  The   QUICK\nbrown\tfox "),
            "the quick brown fox"
        );
    }
}
