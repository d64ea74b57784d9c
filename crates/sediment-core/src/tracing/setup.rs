//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Name of the environment variable holding the log filter.
pub const LOG_ENV: &str = "SEDIMENT_LOG";

/// Initialize the Sediment tracing/logging system.
///
/// Reads `SEDIMENT_LOG` for per-subsystem log levels.
/// Format: `SEDIMENT_LOG=runner=debug,content=info,storage=warn`
///
/// Falls back to `sediment=info` if `SEDIMENT_LOG` is not set or is invalid.
/// Calling it more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("sediment=info"));

        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(filter)
            .try_init();
    });
}
