//! Diagnostic tracing for the runner itself.
//!
//! Tracing events describe what the supervisor did (spawns, timeouts, kills)
//! and go to stderr under `RUST_LOG`. They are separate from job logs
//! (`io/log_sink`), which carry child output keyed by generation job and are
//! written regardless of the filter. Watchdog events carry their thread name
//! (`watchdog-<job>`).

use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global tracing subscriber for the `genrun` binary.
///
/// Reads `RUST_LOG`, falling back to [`DEFAULT_FILTER`], and writes compact
/// lines to stderr so they never mix with job output on stdout. Fails instead
/// of panicking when the embedding process already installed a subscriber.
///
/// # Example
/// ```bash
/// RUST_LOG=genrun=debug genrun --dir ./app generate
/// ```
pub fn init() -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .compact(),
        )
        .try_init()
}
