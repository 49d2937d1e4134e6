//! Tracing initialization for engine binaries and tests.

use tracing_subscriber::EnvFilter;

/// Install the default env-filtered subscriber unless one is already set.
///
/// Honors `RUST_LOG`; without it the engine logs at `info`, which covers the
/// per-cycle status lines, truncation notices, and retarget decisions.
/// Embedders with their own subscriber can skip this entirely.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("extraction_scheduler=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
