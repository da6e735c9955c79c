//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::config::LOG_ENV;

/// Install a stderr subscriber. ETCHOSTS_LOG takes precedence over the
/// level derived from `-v` count (0 = warn, 1 = info, 2+ = debug).
pub fn init(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
