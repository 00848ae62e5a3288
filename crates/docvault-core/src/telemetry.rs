//! Tracing initialization for binaries embedding the engine.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with an env-filter and fmt layer.
///
/// Honors `RUST_LOG`; defaults to `docvault=info` otherwise. Call once at
/// process startup.
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "docvault=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Telemetry initialized");
}
