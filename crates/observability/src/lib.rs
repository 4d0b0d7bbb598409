//! Process-wide logging setup for jobsd hosts (workers, schedulers, tools).

/// Initialize tracing with JSON output and the `info` default filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogConfig::default());
}

/// Tracing subscriber configuration.
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat};
