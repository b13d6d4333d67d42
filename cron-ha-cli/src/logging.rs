//! Tracing subscriber setup

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Level selected by the `--debug` and `--quiet` flags
pub fn log_level(debug: bool, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the global subscriber, writing to stderr
///
/// Stdout stays free for `--check-is-primary` output and the supervised
/// command.
pub fn configure_logging(debug: bool, quiet: bool) {
    let level = log_level(debug, quiet);
    let filter = EnvFilter::new(format!("redis=warn,{level}"));

    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
