//! Logging initialization for the CLI.
//!
//! Library code only emits `tracing` events; subscribers are the
//! binary's concern. `RUST_LOG` overrides the verbosity flags.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Verbosity: quiet → error, default → warn, `-v` → info, `-vv` → debug,
/// `-vvv` → trace. Safe to call more than once (later calls are no-ops).
pub fn init(verbosity: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
