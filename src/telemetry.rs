//! Logging setup for embedders of the orchestrator.

use tracing_subscriber::EnvFilter;

/// Default filter applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already installed, which is
/// the case when the host application configures logging itself.
#[must_use]
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("Starting Lingo agent v{}", env!("CARGO_PKG_VERSION"));
    }
    installed
}
