//! Address canonicalization and stable hashing.
//!
//! Free-text addresses arrive from filenames, OCR output, and LLM
//! extraction, with inconsistent casing, punctuation, unit numbers, and
//! abbreviations. [`normalize`] folds them into a comparable canonical form
//! and [`address_hash`] digests that form into the stable key used for
//! property deduplication. Both are pure functions; `normalize` is
//! idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Bracketed or parenthetical asides: "(rear annexe)", "[plot 7]".
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid regex"));

/// Unit designator followed by its number: "flat 2", "apt 3b".
static UNIT_KEYWORD_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:flat|apartment|apt|unit|suite|room)\s*\d+[a-z]?\b").expect("valid regex")
});

/// Unit number followed by its designator: "2 flat", "14b apartment".
static UNIT_NUMBER_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+[a-z]?\s+(?:flat|apartment|apt|unit|suite|room)\b").expect("valid regex")
});

/// Country/nation tokens that add no identity information.
static COUNTRY_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:united kingdom|great britain|northern ireland|uk|gb|england|scotland|wales)\b")
        .expect("valid regex")
});

/// Punctuation collapsed to whitespace before the final cleanup.
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Fixed abbreviation table. Word-boundary-safe: "st" expands only as a
/// whole word, so "winston street" is never corrupted.
static ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("st", "street"),
        ("rd", "road"),
        ("ave", "avenue"),
        ("ln", "lane"),
        ("dr", "drive"),
        ("cl", "close"),
        ("ct", "court"),
        ("pl", "place"),
        ("sq", "square"),
        ("cres", "crescent"),
        ("gdns", "gardens"),
        ("tce", "terrace"),
        ("pk", "park"),
    ]
    .iter()
    .map(|(abbrev, full)| {
        (
            Regex::new(&format!(r"\b{}\b", abbrev)).expect("valid regex"),
            *full,
        )
    })
    .collect()
});

/// UK postcode, e.g. "SW1A 2AA" or "m4 5bd".
static POSTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z]{1,2}\d[A-Z\d]?\s*\d[A-Z]{2}\b").expect("valid regex")
});

/// A comma-part that names a thoroughfare ("10 Downing Street").
static ROAD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:street|road|avenue|lane|drive|close|court|place|square|crescent|gardens|terrace|park|row|way|hill|st|rd|ave|ln|dr|cl|ct|pl|sq|cres|gdns|tce|pk)\b",
    )
    .expect("valid regex")
});

/// Canonicalize a free-text address into a comparable form.
///
/// Steps, in order: case-fold; strip bracketed content; strip
/// unit/apartment/flat designators; strip country tokens; expand the fixed
/// abbreviation table; collapse punctuation to whitespace; collapse and trim
/// whitespace.
///
/// # Examples
///
/// ```
/// use terrier_core::address::normalize;
///
/// assert_eq!(
///     normalize("Flat 2, 10 Downing St., London, UK"),
///     "10 downing street london"
/// );
/// ```
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = BRACKETED.replace_all(&lowered, " ");
    let stripped = UNIT_KEYWORD_FIRST.replace_all(&stripped, " ");
    let stripped = UNIT_NUMBER_FIRST.replace_all(&stripped, " ");
    let stripped = COUNTRY_TOKENS.replace_all(&stripped, " ");

    let mut expanded = stripped.into_owned();
    for (pattern, replacement) in ABBREVIATIONS.iter() {
        expanded = pattern.replace_all(&expanded, *replacement).into_owned();
    }

    let depunctuated = PUNCTUATION.replace_all(&expanded, " ");
    WHITESPACE.replace_all(&depunctuated, " ").trim().to_string()
}

/// SHA-256 hex digest of a normalized address.
///
/// Deterministic: equal normalized strings always hash identically. The
/// empty string returns the empty digest, a sentinel that is never matched
/// against a real property.
pub fn address_hash(normalized: &str) -> String {
    if normalized.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract a UK postcode from a raw address, uppercased with a single
/// internal space.
pub fn extract_postcode(raw: &str) -> Option<String> {
    POSTCODE.find(raw).map(|m| {
        let compact: String = m
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        // Inward code is always the last three characters
        let split = compact.len() - 3;
        format!("{} {}", &compact[..split], &compact[split..])
    })
}

/// Extract the comma-part that names the road, if any.
pub fn extract_road_line(raw: &str) -> Option<String> {
    raw.split(',')
        .map(str::trim)
        .find(|part| !part.is_empty() && ROAD_LINE.is_match(part) && !POSTCODE.is_match(part))
        .map(|part| part.to_string())
}

/// Produce alternate phrasings to retry against the geocoder when the
/// literal string fails to resolve.
///
/// Ordered fullest-first: the cleaned raw address, the last two comma-parts
/// suffixed with ", UK", the road-name line alone, and the bare postcode.
/// Deduplicated preserving order; callers try index 0 first and fall back
/// toward sparser variations.
pub fn generate_address_variations(raw: &str) -> Vec<String> {
    let mut variations: Vec<String> = Vec::new();

    let cleaned = WHITESPACE.replace_all(raw.trim(), " ").to_string();
    if !cleaned.is_empty() {
        variations.push(cleaned);
    }

    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() > 2 {
        variations.push(format!(
            "{}, {}, UK",
            parts[parts.len() - 2],
            parts[parts.len() - 1]
        ));
    }

    if let Some(road) = extract_road_line(raw) {
        variations.push(road);
    }

    if let Some(postcode) = extract_postcode(raw) {
        variations.push(postcode);
    }

    // Order-preserving dedup; equal variations collapse to the fullest rank
    let mut seen = std::collections::HashSet::new();
    variations.retain(|v| seen.insert(v.to_lowercase()));
    variations
}
