//! Logging initialization.
//!
//! The library logs through `tracing` throughout; binaries call [`init`]
//! once at startup to install a formatted subscriber filtered by the
//! standard `RUST_LOG` environment variable.

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
