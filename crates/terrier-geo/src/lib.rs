//! # terrier-geo
//!
//! Geocoding gateway implementations and the address resolution pipeline:
//! normalization, hashing, and bounded variation-retry geocoding that
//! always degrades gracefully rather than blocking enrichment.

pub mod client;
pub mod mock;
pub mod resolver;

pub use client::HttpGeocoder;
pub use mock::MockGeocoder;
pub use resolver::resolve_address;
