//! HTTP geocoding backend.
//!
//! Speaks to a configurable provider endpoint returning JSON; the provider
//! itself is a black box. Transport and provider failures degrade to
//! [`GeocodeStatus::Error`] results rather than surfacing as `Err`, so the
//! resolution pipeline can continue through its variations.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use terrier_core::defaults::{env_str, env_u64, GEOCODER_URL, GEOCODE_TIMEOUT_SECS};
use terrier_core::{GeocodeResult, GeocodeStatus, GeocodingGateway, Result};

/// Environment variable overriding the provider endpoint.
pub const GEOCODER_URL_VAR: &str = "TERRIER_GEOCODER_URL";

/// Environment variable carrying the provider API key, if required.
pub const GEOCODER_KEY_VAR: &str = "TERRIER_GEOCODER_KEY";

/// Environment variable overriding the per-request timeout (seconds).
pub const GEOCODER_TIMEOUT_VAR: &str = "TERRIER_GEOCODE_TIMEOUT_SECS";

/// Provider response envelope.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    status: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    formatted_address: Option<String>,
}

/// Geocoding backend over a JSON HTTP provider.
pub struct HttpGeocoder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGeocoder {
    /// Create a geocoder from environment configuration.
    pub fn from_env() -> Result<Self> {
        let base_url = env_str(GEOCODER_URL_VAR, GEOCODER_URL);
        let api_key = std::env::var(GEOCODER_KEY_VAR).ok();
        let timeout = env_u64(GEOCODER_TIMEOUT_VAR, GEOCODE_TIMEOUT_SECS);
        Self::with_config(base_url, api_key, Duration::from_secs(timeout))
    }

    /// Create a geocoder with explicit configuration.
    pub fn with_config(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| terrier_core::Error::Config(format!("HTTP client: {e}")))?;

        info!(base_url = %base_url, "initializing HTTP geocoder");
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn map_response(response: ProviderResponse) -> GeocodeResult {
        let status = match response.status.as_str() {
            "success" | "ok" => GeocodeStatus::Success,
            "not_found" | "zero_results" => GeocodeStatus::NotFound,
            "empty_address" => GeocodeStatus::EmptyAddress,
            other => {
                warn!(provider_status = other, "unrecognized geocoder status");
                GeocodeStatus::Error
            }
        };

        if status != GeocodeStatus::Success {
            return GeocodeResult::unresolved(status);
        }

        GeocodeResult {
            status,
            latitude: response.latitude,
            longitude: response.longitude,
            confidence: response.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
            formatted_address: response.formatted_address,
        }
    }
}

#[async_trait]
impl GeocodingGateway for HttpGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult> {
        if address.trim().is_empty() {
            return Ok(GeocodeResult::unresolved(GeocodeStatus::EmptyAddress));
        }

        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("q", address)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "geocoder request failed");
                return Ok(GeocodeResult::unresolved(GeocodeStatus::Error));
            }
        };

        if !response.status().is_success() {
            warn!(http_status = %response.status(), "geocoder returned non-success status");
            return Ok(GeocodeResult::unresolved(GeocodeStatus::Error));
        }

        match response.json::<ProviderResponse>().await {
            Ok(body) => {
                let result = Self::map_response(body);
                debug!(
                    geocode_status = result.status.as_str(),
                    confidence = result.confidence,
                    "geocode attempt finished"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "geocoder response unparsable");
                Ok(GeocodeResult::unresolved(GeocodeStatus::Error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_response_success() {
        let result = HttpGeocoder::map_response(ProviderResponse {
            status: "success".to_string(),
            latitude: Some(51.5034),
            longitude: Some(-0.1276),
            confidence: Some(0.92),
            formatted_address: Some("10 Downing St, London SW1A 2AA".to_string()),
        });
        assert_eq!(result.status, GeocodeStatus::Success);
        assert_eq!(result.latitude, Some(51.5034));
        assert!((result.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_map_response_not_found_drops_coordinates() {
        let result = HttpGeocoder::map_response(ProviderResponse {
            status: "zero_results".to_string(),
            latitude: Some(1.0),
            longitude: Some(2.0),
            confidence: Some(0.5),
            formatted_address: None,
        });
        assert_eq!(result.status, GeocodeStatus::NotFound);
        assert!(result.latitude.is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_map_response_unknown_status_is_error() {
        let result = HttpGeocoder::map_response(ProviderResponse {
            status: "rate_limited".to_string(),
            latitude: None,
            longitude: None,
            confidence: None,
            formatted_address: None,
        });
        assert_eq!(result.status, GeocodeStatus::Error);
    }

    #[test]
    fn test_map_response_confidence_clamped() {
        let result = HttpGeocoder::map_response(ProviderResponse {
            status: "ok".to_string(),
            latitude: Some(0.0),
            longitude: Some(0.0),
            confidence: Some(7.5),
            formatted_address: None,
        });
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_empty_address_short_circuits() {
        let geocoder = HttpGeocoder::with_config(
            "http://localhost:1/geocode".to_string(),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        let result = geocoder.geocode("   ").await.unwrap();
        assert_eq!(result.status, GeocodeStatus::EmptyAddress);
    }
}
