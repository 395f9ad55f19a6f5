//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// JSON logs with timestamps; level configurable via `RUST_LOG` (defaults to
/// `info`). Safe to call multiple times (subsequent calls are no-ops), which
/// keeps parallel test binaries happy.
pub fn init() {
    // sqlx logs every statement at info; keep it at warn unless asked for.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
