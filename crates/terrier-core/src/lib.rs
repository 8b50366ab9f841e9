//! # terrier-core
//!
//! Core types, traits, and address canonicalization for the terrier
//! property identity resolution and evidence grounding engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that other terrier crates depend on.

pub mod address;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use address::{address_hash, extract_postcode, extract_road_line, generate_address_variations, normalize};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
