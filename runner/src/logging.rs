//! Diagnostic tracing for the runner and its hosts.
//!
//! All output goes to stderr. Hosts that speak a protocol on stdout (the MCP
//! server) rely on this: nothing written here may reach stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the global tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to [`DEFAULT_FILTER`]. Compact format, stderr.
/// Calling it again after a subscriber is installed is a no-op.
///
/// # Example
/// ```bash
/// RUST_LOG=subagents_runner=debug subagents-mcp --agents-dir ./agents
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact(),
        )
        .try_init();
}
