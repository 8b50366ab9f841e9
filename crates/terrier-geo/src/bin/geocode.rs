//! Terrier address resolution CLI.
//!
//! Resolves a free-text address through the configured geocoding provider
//! and prints the full resolution (normalized form, hash, coordinates,
//! variation used) as JSON.
//!
//! Usage:
//!   cargo run --bin terrier-geocode -- "Flat 2, 10 Downing St, London"
//!   TERRIER_GEOCODER_URL=https://geo.example/geocode cargo run --bin terrier-geocode -- "SW1A 2AA"

use anyhow::{bail, Context};
use std::env;
use tracing_subscriber::EnvFilter;

use terrier_geo::{resolve_address, HttpGeocoder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        bail!("usage: terrier-geocode <address>");
    }
    let address = args.join(" ");

    let geocoder = HttpGeocoder::from_env().context("initializing geocoder")?;
    let resolved = resolve_address(&geocoder, &address).await;

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}
