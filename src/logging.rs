//! Logging setup.
//!
//! Logs always go to stderr; stdout is reserved for the cart summary CSV.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global subscriber. `RUST_LOG` wins over `level` when set.
///
/// Calling it twice is harmless: the second call is ignored.
pub fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
