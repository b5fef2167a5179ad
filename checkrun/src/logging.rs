//! Development-time tracing for debugging the harness.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. Test progress and
//! failure diagnostics are product output on stdout and are unaffected by it.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the stderr subscriber.
///
/// ```bash
/// RUST_LOG=checkrun::io::pipeline=debug checkrun test/codegen/x86_64/atomic.c /tmp/out
/// ```
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
