//! Tracing setup for the Nebula workflow engine.
//!
//! Every binary (the CLI, the illustrative HTTP service) calls [`init`] once
//! at startup. Library crates only ever emit `tracing` events; they never
//! install a subscriber themselves.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global `tracing` subscriber.
///
/// The filter defaults to `info` and is overridden by the `RUST_LOG`
/// environment variable, following the same convention as every other
/// `tracing-subscriber`-based Nebula service.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Like [`init`], but renders structured JSON lines instead of the default
/// human-readable format. Used by services running behind a log collector.
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true))
        .try_init();
}
