//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - Counters for engine activity

mod logging;
mod metrics;

pub use logging::{LogConfig, LogFormat, LogLevel, init_logging};
pub use metrics::{Counter, EngineMetrics};
