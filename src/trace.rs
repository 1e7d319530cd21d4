//! Process-wide `tracing` subscriber.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that replaces the level derived from `-v`/`-q`. Takes
/// `tracing_subscriber` directives such as `flowtag=debug`.
pub const LOG_ENV: &str = "FLOWTAG_LOG";

/// Installs the global subscriber writing to stderr.
pub fn init(color: bool, json: bool, levels: &str) {
    let builder = fmt()
        .with_env_filter(EnvFilter::new(levels))
        .with_writer(std::io::stderr);

    // Ignore errors when setting, since tests can initialize this
    // multiple times.
    let _ = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.with_ansi(color).try_init()
    };
}
