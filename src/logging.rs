use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,remote_connector=trace
pub fn init() {
    // Default to 'info' level if RUST_LOG is not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    init_with(filter, false);
}

/// Initialize with an explicit filter. With `json` set, every event is
/// written as one JSON object for log shippers.
pub fn init_with(filter: EnvFilter, json: bool) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(filter);
        if json {
            registry
                .with(fmt::layer().json().with_current_span(false))
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(true) // Include module path in logs
                        .with_thread_ids(true) // Useful for debugging concurrency issues
                        .with_line_number(true),
                )
                .init();
        }

        tracing::info!(json, "Logging initialized");
    });
}

/// Macro for logging a failed attempt inside a retry loop
#[macro_export]
macro_rules! retry_event {
    ($operation:expr, $attempt:expr, $max:expr, $class:expr, $kind:expr, $wait_ms:expr) => {
        tracing::warn!(
            operation = $operation,
            attempt_index = $attempt,
            max_attempts = $max,
            error_class = $class,
            error_kind = $kind,
            wait_ms = $wait_ms,
            "Attempt failed, backing off"
        )
    };
}

/// Macro for logging the attempt that ends a retry loop
#[macro_export]
macro_rules! retry_stop {
    ($operation:expr, $attempt:expr, $max:expr, $class:expr, $kind:expr, $reason:expr) => {
        tracing::warn!(
            operation = $operation,
            attempt_index = $attempt,
            max_attempts = $max,
            error_class = $class,
            error_kind = $kind,
            stop_reason = ?$reason,
            "Attempt failed, giving up"
        )
    };
}

/// Macro for logging a health verdict
#[macro_export]
macro_rules! health_verdict {
    ($verdict:expr) => {
        tracing::info!(
            status = ?$verdict.status,
            handle_present = $verdict.handle_present,
            probe_ok = $verdict.probe_ok,
            detail = $verdict.detail.as_deref().unwrap_or(""),
            "Health verdict"
        )
    };
}
