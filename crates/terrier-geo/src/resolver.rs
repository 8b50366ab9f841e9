//! Address resolution pipeline: normalization, hashing, and bounded
//! variation-retry geocoding.
//!
//! Free-text addresses often fail to geocode literally (unit prefixes, OCR
//! noise, agent shorthand). The pipeline retries the gateway across
//! progressively sparser variations of the address, fullest first, and
//! returns the first success with its confidence discounted by how sparse
//! the resolving variation was. Exhaustion degrades to a `not_found`
//! result; the caller always receives a usable [`ResolvedAddress`].

use tracing::{debug, warn};

use terrier_core::address::{address_hash, generate_address_variations, normalize};
use terrier_core::defaults::{MAX_GEOCODE_VARIATIONS, VARIATION_CONFIDENCE_DECAY};
use terrier_core::{GeocodeResult, GeocodeStatus, GeocodingGateway, ResolvedAddress};

/// Resolve a raw address through the gateway.
///
/// Never returns an error and never blocks beyond the gateway's own
/// per-call timeout times the bounded variation count.
pub async fn resolve_address(gateway: &dyn GeocodingGateway, raw: &str) -> ResolvedAddress {
    let normalized = normalize(raw);
    let hash = address_hash(&normalized);

    if normalized.is_empty() {
        return ResolvedAddress {
            raw: raw.to_string(),
            normalized,
            address_hash: hash,
            geocode: GeocodeResult::unresolved(GeocodeStatus::EmptyAddress),
            attempted_variation: String::new(),
            variation_rank: 0,
        };
    }

    let variations: Vec<String> = generate_address_variations(raw)
        .into_iter()
        .take(MAX_GEOCODE_VARIATIONS)
        .collect();

    let mut last_status = GeocodeStatus::NotFound;
    let mut last_variation = String::new();

    for (rank, variation) in variations.iter().enumerate() {
        let result = match gateway.geocode(variation).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, variation_rank = rank, "geocode call failed");
                GeocodeResult::unresolved(GeocodeStatus::Error)
            }
        };

        last_variation = variation.clone();
        match result.status {
            GeocodeStatus::Success => {
                let discounted = discount_confidence(result, rank);
                debug!(
                    variation_rank = rank,
                    confidence = discounted.confidence,
                    "address resolved"
                );
                return ResolvedAddress {
                    raw: raw.to_string(),
                    normalized,
                    address_hash: hash,
                    geocode: discounted,
                    attempted_variation: last_variation,
                    variation_rank: rank,
                };
            }
            status => {
                last_status = status;
                debug!(
                    variation_rank = rank,
                    geocode_status = status.as_str(),
                    "variation did not resolve"
                );
            }
        }
    }

    // Exhausted every variation; empty-address from the provider still
    // degrades to not_found here since we only sent non-empty strings
    let final_status = match last_status {
        GeocodeStatus::Error => GeocodeStatus::Error,
        _ => GeocodeStatus::NotFound,
    };
    ResolvedAddress {
        raw: raw.to_string(),
        normalized,
        address_hash: hash,
        geocode: GeocodeResult::unresolved(final_status),
        attempted_variation: last_variation,
        variation_rank: variations.len().saturating_sub(1),
    }
}

/// A hit on a sparser variation is weaker evidence of identity than a hit
/// on the literal address.
fn discount_confidence(mut result: GeocodeResult, rank: usize) -> GeocodeResult {
    if rank > 0 {
        result.confidence *= VARIATION_CONFIDENCE_DECAY.powi(rank as i32);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGeocoder;

    fn success(confidence: f64) -> GeocodeResult {
        GeocodeResult {
            status: GeocodeStatus::Success,
            latitude: Some(51.5),
            longitude: Some(-0.12),
            confidence,
            formatted_address: Some("10 Downing St, London SW1A 2AA, UK".to_string()),
        }
    }

    #[tokio::test]
    async fn test_literal_address_resolves_first() {
        let mock = MockGeocoder::new();
        mock.respond_to("10 Downing Street, London, SW1A 2AA", success(0.9));

        let resolved = resolve_address(&mock, "10 Downing Street, London, SW1A 2AA").await;
        assert_eq!(resolved.geocode.status, GeocodeStatus::Success);
        assert_eq!(resolved.variation_rank, 0);
        assert!((resolved.geocode.confidence - 0.9).abs() < 1e-9);
        assert_eq!(resolved.normalized, "10 downing street london sw1a 2aa");
        assert_eq!(resolved.address_hash.len(), 64);
    }

    #[tokio::test]
    async fn test_fallback_variation_discounts_confidence() {
        let mock = MockGeocoder::new();
        // Only the bare postcode resolves
        mock.respond_to("SW1A 2AA", success(0.8));

        let resolved =
            resolve_address(&mock, "Flat 9, 10 Downing Street, London, SW1A 2AA").await;
        assert_eq!(resolved.geocode.status, GeocodeStatus::Success);
        assert!(resolved.variation_rank > 0);
        assert!(resolved.geocode.confidence < 0.8);
        assert_eq!(resolved.attempted_variation, "SW1A 2AA");
    }

    #[tokio::test]
    async fn test_exhaustion_degrades_to_not_found() {
        let mock = MockGeocoder::new();
        let resolved = resolve_address(&mock, "Nowhere Hall, Atlantis").await;
        assert_eq!(resolved.geocode.status, GeocodeStatus::NotFound);
        assert!(resolved.geocode.latitude.is_none());
        // Hash is still produced for identity resolution
        assert_eq!(resolved.address_hash.len(), 64);
        assert!(mock.call_count() >= 1);
    }

    #[tokio::test]
    async fn test_empty_address_is_sentinel() {
        let mock = MockGeocoder::new();
        let resolved = resolve_address(&mock, "   ").await;
        assert_eq!(resolved.geocode.status, GeocodeStatus::EmptyAddress);
        assert!(resolved.address_hash.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_errors_do_not_abort_pipeline() {
        let mock = MockGeocoder::failing();
        mock.respond_to("SW1A 2AA", success(0.7));

        let resolved =
            resolve_address(&mock, "Flat 9, 10 Downing Street, London, SW1A 2AA").await;
        // Earlier variations error, the postcode still resolves
        assert_eq!(resolved.geocode.status, GeocodeStatus::Success);
        assert_eq!(resolved.attempted_variation, "SW1A 2AA");
    }

    #[tokio::test]
    async fn test_bounded_attempts() {
        let mock = MockGeocoder::new();
        let _ = resolve_address(&mock, "a, b, c, d, e, f, g, h Street, SW1A 2AA").await;
        assert!(mock.call_count() <= MAX_GEOCODE_VARIATIONS);
    }
}
