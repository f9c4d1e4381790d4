//! Logging setup.
//!
//! `-v` / `-d` raise the default `tracing` filter level; everything writes to
//! stderr so stdout stays clean for command output (branch listings, JSON-free
//! plain text per §6).

use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;

pub fn init(verbosity: Verbosity) {
    let default_level = match verbosity {
        Verbosity::Normal => "info",
        Verbosity::Verbose => "debug",
        Verbosity::Debug => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}
