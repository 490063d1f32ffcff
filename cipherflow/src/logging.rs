//! Logging initialization.
//!
//! Opt-in console subscriber for binaries and examples embedding the
//! orchestrator; library code only ever emits `tracing` events and never
//! installs a subscriber on its own. Filtering follows the `RUST_LOG`
//! environment variable, defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Installs a console `tracing` subscriber.
///
/// Safe to call more than once: subsequent calls are no-ops because a
/// global subscriber is already installed.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
