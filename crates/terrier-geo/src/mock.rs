//! Scripted geocoding backend for tests.
//!
//! Responds with a scripted result per exact address string and a
//! configurable default for everything else; counts calls so tests can
//! assert retry bounds.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use terrier_core::{GeocodeResult, GeocodeStatus, GeocodingGateway, Result};

/// Mock geocoder with per-address scripted responses.
pub struct MockGeocoder {
    responses: Mutex<HashMap<String, GeocodeResult>>,
    default_status: GeocodeStatus,
    calls: AtomicUsize,
}

impl MockGeocoder {
    /// Every unscripted address resolves as not_found.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default_status: GeocodeStatus::NotFound,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every unscripted address fails with a provider error.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default_status: GeocodeStatus::Error,
            calls: AtomicUsize::new(0),
        }
    }

    /// Script the response for an exact address string.
    pub fn respond_to(&self, address: &str, result: GeocodeResult) {
        self.responses
            .lock()
            .expect("mock lock poisoned")
            .insert(address.to_string(), result);
    }

    /// Number of geocode calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeocodingGateway for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if address.trim().is_empty() {
            return Ok(GeocodeResult::unresolved(GeocodeStatus::EmptyAddress));
        }
        let scripted = self
            .responses
            .lock()
            .expect("mock lock poisoned")
            .get(address)
            .cloned();
        Ok(scripted.unwrap_or_else(|| GeocodeResult::unresolved(self.default_status)))
    }
}
