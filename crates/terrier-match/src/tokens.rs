//! Currency, number, and date token extraction for chunk scoring.
//!
//! Monetary figures are the strongest alignment signal between a claimed
//! fact and its source passage: "£2,400,000" appearing on both sides is
//! near-conclusive, while two different figures rule a pairing out. Tokens
//! are normalized (lowercased, commas and internal spaces dropped) so
//! surface variants of the same figure compare equal.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Currency-or-magnitude tokens: "£2,400,000", "$1.5m", "1.2 million",
/// "350k". Bare numbers with a magnitude suffix count as currency-like;
/// bare "m" is only accepted after a currency symbol (it reads as metres
/// otherwise).
static CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[£$€]\s*\d[\d,]*(?:\.\d+)?(?:\s*(?:million|billion|mn|bn|m|k)\b)?|\b\d[\d,]*(?:\.\d+)?\s*(?:million|billion|mn|bn|k)\b",
    )
    .expect("valid regex")
});

/// Plain numeric tokens, including decimals and comma-grouped figures.
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d[\d,]*(?:\.\d+)?\b").expect("valid regex"));

/// Four-digit years in the plausible document range.
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

/// Words too common to discriminate between chunks.
const STOPWORDS: [&str; 24] = [
    "the", "and", "was", "were", "that", "this", "with", "from", "have", "has", "been", "for",
    "are", "its", "their", "which", "what", "when", "where", "will", "would", "there", "about",
    "into",
];

/// Valuation vocabulary shared by snippets and valuation-section chunks.
const VALUATION_KEYWORDS: [&str; 6] = [
    "market value",
    "valuation",
    "valued at",
    "appraisal",
    "open market",
    "reinstatement",
];

fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect::<String>()
        .to_lowercase()
}

/// Extract normalized currency-or-magnitude tokens.
pub fn extract_currency_tokens(text: &str) -> HashSet<String> {
    CURRENCY
        .find_iter(text)
        .map(|m| normalize_token(m.as_str()))
        .collect()
}

/// Extract normalized plain-number tokens (commas stripped).
pub fn extract_number_tokens(text: &str) -> HashSet<String> {
    NUMBER
        .find_iter(text)
        .map(|m| normalize_token(m.as_str()))
        .collect()
}

/// Extract four-digit year tokens.
pub fn extract_year_tokens(text: &str) -> HashSet<String> {
    YEAR.find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// The last `limit` discriminative words of a context span, lowercased.
///
/// Skips stopwords and anything four characters or shorter; used by
/// citation-context matching where the words nearest the citation marker
/// carry the claim being cited.
pub fn significant_trailing_words(text: &str, limit: usize) -> Vec<String> {
    let mut words: Vec<String> = text
        .split_whitespace()
        .rev()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.len() > 4 || (w.len() == 4 && !STOPWORDS.contains(&w.as_str())))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .take(limit)
        .collect();
    words.reverse();
    words
}

/// Whether the text carries valuation vocabulary.
pub fn has_valuation_vocabulary(text: &str) -> bool {
    let lowered = text.to_lowercase();
    VALUATION_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_symbol_tokens() {
        let tokens = extract_currency_tokens("The price was £2,400,000 at sale");
        assert!(tokens.contains("£2400000"));
    }

    #[test]
    fn test_currency_surface_variants_compare_equal() {
        let a = extract_currency_tokens("£2,400,000");
        let b = extract_currency_tokens("£2, 400,000".replace(", 4", ",4").as_str());
        assert_eq!(a, b);
    }

    #[test]
    fn test_currency_magnitude_forms() {
        let tokens = extract_currency_tokens("roughly 1.2 million, then 350k later");
        assert!(tokens.contains("1.2million"));
        assert!(tokens.contains("350k"));
    }

    #[test]
    fn test_currency_symbol_with_m_suffix() {
        let tokens = extract_currency_tokens("guide price £1.5m");
        assert!(tokens.contains("£1.5m"));
    }

    #[test]
    fn test_bare_metres_not_currency() {
        let tokens = extract_currency_tokens("the plot extends 1200 m beyond");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_suffix_not_split_off_following_word() {
        let tokens = extract_currency_tokens("a site of £1,200,000 km from town");
        assert!(tokens.contains("£1200000"));
        assert!(!tokens.iter().any(|t| t.ends_with('k')));
    }

    #[test]
    fn test_no_currency_tokens() {
        assert!(extract_currency_tokens("no figures here at all").is_empty());
    }

    #[test]
    fn test_number_tokens_strip_commas() {
        let tokens = extract_number_tokens("2,400,000 over 3 bedrooms");
        assert!(tokens.contains("2400000"));
        assert!(tokens.contains("3"));
    }

    #[test]
    fn test_year_tokens() {
        let tokens = extract_year_tokens("sold in 2022, built 1987, ref 3077");
        assert!(tokens.contains("2022"));
        assert!(tokens.contains("1987"));
        assert!(!tokens.contains("3077"));
    }

    #[test]
    fn test_significant_trailing_words() {
        let words =
            significant_trailing_words("the property was valued above the asking price", 3);
        assert_eq!(words, vec!["valued", "above", "asking", "price"][1..]);
    }

    #[test]
    fn test_significant_trailing_words_skips_stopwords_and_short() {
        let words = significant_trailing_words("it was in the area", 5);
        assert_eq!(words, vec!["area"]);
    }

    #[test]
    fn test_valuation_vocabulary() {
        assert!(has_valuation_vocabulary("The Market Value is assessed at"));
        assert!(has_valuation_vocabulary("per our valuation dated"));
        assert!(!has_valuation_vocabulary("three bedrooms and a garage"));
    }
}
