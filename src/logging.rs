//! Ambient logging. The core itself only emits `tracing` events; wiring
//! up a subscriber is left to the application, except in tests and
//! demos, which use [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` formatter honoring `RUST_LOG`,
/// defaulting to `info` when unset. Idempotent: a second call is a
/// harmless no-op if a global subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
