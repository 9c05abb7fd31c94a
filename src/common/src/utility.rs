use std::str::FromStr;

use tracing::{warn, Level};

/// Installs the fmt subscriber. Safe to call more than once: later calls
/// (e.g. from several tests) are ignored. An unknown level falls back to
/// `DEBUG` with a warning.
pub fn init_tracing(max_level: &str) {
    let level = Level::from_str(max_level).ok();
    let _ = tracing_subscriber::fmt()
        .with_line_number(true)
        .with_file(true)
        .with_max_level(level.unwrap_or(Level::DEBUG))
        .try_init();
    if level.is_none() {
        warn!("Unknown log level {:?}, logging at DEBUG", max_level);
    }
}
