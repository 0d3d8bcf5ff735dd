//! Diagnostic logging bootstrap.
//!
//! Records go to stderr so stdout stays reserved for the transcript.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set and parseable; otherwise `default_filter` is used,
/// falling back to [`DEFAULT_FILTER`] if that does not parse either. Returns
/// false when a subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(build_filter(default_filter))
        .try_init()
        .is_ok()
}

fn build_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
