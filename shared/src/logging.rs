//! Shared logging utilities for consistent tracing across the uploader

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::errors::{SharedError, SharedResult};

/// Default filter directives for a base level
pub fn filter_directives(base_level: &str) -> String {
    format!("uploader={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `base_level` when set. With `json` the output is one
/// JSON object per line.
pub fn init_tracing(base_level: &str, json: bool) -> SharedResult<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(base_level)));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    result.map_err(|e| SharedError::LoggingInit {
        message: e.to_string(),
    })
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for row-aware info logging
#[macro_export]
macro_rules! row_info {
    ($row:expr, $($arg:tt)*) => {
        tracing::info!(
            row = $row,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for row-aware warning logging
#[macro_export]
macro_rules! row_warn {
    ($row:expr, $($arg:tt)*) => {
        tracing::warn!(
            row = $row,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for row-aware error logging
#[macro_export]
macro_rules! row_error {
    ($row:expr, $($arg:tt)*) => {
        tracing::error!(
            row = $row,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for row-aware debug logging
#[macro_export]
macro_rules! row_debug {
    ($row:expr, $($arg:tt)*) => {
        tracing::debug!(
            row = $row,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(run_id: &str, details: &str) {
    info!(
        run = %run_id,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(run_id: &str, reason: &str) {
    info!(
        run = %run_id,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(run_id: &str, context: &str, error: &dyn std::fmt::Display) {
    error!(
        run = %run_id,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(run_id: &str, message: &str) {
    info!(
        run = %run_id,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

/// Contextual logging helper for progress updates
pub fn log_progress(run_id: &str, action: &str, details: &str) {
    info!(
        run = %run_id,
        timestamp = format_timestamp(),
        "📋 {}: {}",
        action,
        details
    );
}
