//! Prometheus metrics and structured logging for mmbot.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters and gauges for the trading loop
//! - Periodic session statistics summary

pub mod error;
pub mod logging;
pub mod metrics;
pub mod stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{CycleStage, Metrics};
pub use stats::{SessionStats, SessionStatsReporter};
