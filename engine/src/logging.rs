//! Verbosity-gated logging macros backed by `tracing`.
//!
//! The engine is configured with a numeric verbosity so callers can turn
//! planning chatter up or down per call without touching the global
//! subscriber:
//! - 0: SILENT (warnings and errors only)
//! - 1: CHANGES (schedule moves, assignments, reallocations)
//! - 2: CHECKS (candidate scoring, conflict checks)
//! - 3: DEBUG (graph and pass internals)
//!
//! Events are emitted under the `taskflow_engine` target, so a subscriber
//! filter still applies on top of the verbosity gate.

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1) as a `tracing` info event.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!(target: "taskflow_engine", $($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2) as a `tracing` debug event.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!(target: "taskflow_engine", $($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3) as a `tracing` trace event.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!(target: "taskflow_engine", $($arg)*);
        }
    };
}
