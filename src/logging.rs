//! Logging configuration using tracing.
//!
//! Log lines go to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when neither `RUST_LOG` nor the settings give a valid filter
pub const DEFAULT_LEVEL: &str = "warn";

/// Build the filter: `RUST_LOG` first, then `level`, then `warn`
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Initialize logging with the specified level
///
/// Calling this more than once is harmless; later calls keep the first
/// subscriber.
pub fn init(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter_for(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
