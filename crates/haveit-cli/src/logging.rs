//! Tracing setup for the `have` binary.
//!
//! Only the binary logs. The engine reports through observer events, which
//! `commands::install` turns into tracing records.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log target of this crate, used to scope `-v`.
const TARGET: &str = "have";

/// `-v` count to level: none is INFO, `-v` DEBUG, `-vv` and up TRACE.
fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// `RUST_LOG` (default `warn`) for dependencies, `level` for our own target.
fn filter_for(level: Level) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match format!("{TARGET}={level}").parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install the global subscriber. Records go to stderr, as JSON lines when
/// `json` is set; stdout is left to progress lines or the JSON result.
pub fn init(verbosity: u8, json: bool) {
    let registry = tracing_subscriber::registry().with(filter_for(level_for(verbosity)));

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
