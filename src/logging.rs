// Logging setup
//
// One global subscriber per process. `RUST_LOG` takes precedence over the
// level passed in, so `RUST_LOG=tube_grab=debug` shows progress parsing.

use time::macros::format_description;
use time::UtcOffset;
use tracing::Level;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the filter: `RUST_LOG` if set and valid, `level` otherwise
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Initialize the logging system.
///
/// Returns an error instead of panicking when a subscriber is already
/// installed (tests, embedding applications).
pub fn init_logging(level: Level) -> Result<(), TryInitError> {
    // Local offset is unavailable on some multithreaded Unix setups
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, format_description!("[hour]:[minute]:[second]"));

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_timer(timer).with_target(level >= Level::DEBUG))
        .try_init()
}
