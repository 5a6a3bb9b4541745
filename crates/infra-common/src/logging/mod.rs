//! Tracing setup and structured error logging.
//!
//! §7 of the protocol spec requires that every error produce one structured
//! log record carrying `{file, line, status-code, context}`. [`context`]
//! provides the per-call-site context object; [`setup`] wires up
//! `tracing-subscriber` the way the rest of the stack expects; [`metrics`]
//! is a minimal counters/timers facility for the handful of gauges the
//! transport and TURN layers expose (active transactions, retransmit
//! counts, allocation lifetimes).

pub mod context;
pub mod metrics;
pub mod setup;

pub use context::LogContext;
pub use metrics::{Metric, MetricsCollector};
pub use setup::{setup_logging, LoggingConfig};

/// Log one structured error record, as required by the error-handling
/// design: `{file, line, status-code, context}`.
#[macro_export]
macro_rules! log_error_record {
    ($status:expr, $ctx:expr) => {
        tracing::error!(
            file = file!(),
            line = line!(),
            status = %$status,
            context = %$ctx,
            "protocol error"
        );
    };
}
