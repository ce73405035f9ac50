//! Tracing subscriber setup for the `uf` binary.

use tracing_subscriber::EnvFilter;

use crate::config::resolver::DEFAULT_LOG_LEVEL;

/// Build a filter from a directive, falling back to `warn` if it does not parse.
pub fn filter_for(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Install the global subscriber. Logs go to stderr so stdout stays parseable.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
