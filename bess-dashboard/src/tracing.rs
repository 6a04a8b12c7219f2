//! Logging setup.
//!
//! Code in this crate logs through the macros in [`prelude`]. Binaries call
//! [`init_journald_or_stdout`] once at startup.

use ::tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod prelude {
    pub use ::tracing::{debug, error, info, trace, warn};
}

/// Install the global subscriber.
///
/// Logs go to the systemd journal when the process was started by systemd
/// (`JOURNAL_STREAM` is set) and to stdout otherwise. Filtering follows
/// `RUST_LOG`, defaulting to `info`.
pub fn init_journald_or_stdout() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if std::env::var_os("JOURNAL_STREAM").is_some() {
        match tracing_journald::layer() {
            Ok(journald) => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(journald)
                    .init();
                return;
            }
            Err(e) => eprintln!("journald unavailable, logging to stdout: {e}"),
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
