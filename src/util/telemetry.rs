//! Tracing bootstrap for processes embedding the runtime primitives.

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `RUST_LOG` if no global subscriber
/// is set yet. Embedding processes that bring their own subscriber win; this
/// is a convenience for tools and tests.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
