//! Tracing setup for the binary.

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber.
///
/// Logs at INFO and above by default; override with `RUST_LOG`, e.g.
/// `RUST_LOG=gitsync=debug`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "gitsync=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
