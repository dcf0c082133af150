//! Logging configuration for sqlfeed.
//!
//! Logs go to stderr so stdout stays clean for result output. The level
//! defaults to `info`, raised to `debug` by the `--debug` flag, and `RUST_LOG`
//! overrides both.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
