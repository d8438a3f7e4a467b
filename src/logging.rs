//! Log subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the tracing subscriber with timestamps.
///
/// The default filter is `sinestream=info`, or `sinestream=warn` in quiet
/// mode (which hides the per-second transmit health line and the
/// connect/disconnect notices). `RUST_LOG` overrides both.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init(quiet: bool) {
    let default = if quiet {
        "sinestream=warn"
    } else {
        "sinestream=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}
