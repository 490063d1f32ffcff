//! Operator alerting seam.
//!
//! Terminal failures are the only condition surfaced beyond the log stream;
//! they go to an [`AlertSink`] injected at construction. Delivery is
//! fire-and-forget: a slow or broken sink must never stall result
//! processing, so implementations do their own buffering or dropping.

pub mod noop;
pub mod tracing_adapter;

use std::fmt;

pub use noop::{NoopAlertSink, RecordingAlertSink};
pub use tracing_adapter::TracingAlertSink;

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertLevel {
    /// Informational; no operator action expected.
    Info,
    /// Degraded but self-healing.
    Warning,
    /// Operator attention required.
    Critical,
}

impl AlertLevel {
    /// Returns a string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for operator alerts.
pub trait AlertSink: Send + Sync + 'static {
    /// Delivers one alert. Must not block the caller.
    fn notify(&self, level: AlertLevel, message: &str, context: &[(&'static str, String)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(AlertLevel::Info < AlertLevel::Warning);
        assert!(AlertLevel::Warning < AlertLevel::Critical);
    }

    #[test]
    fn level_as_str() {
        assert_eq!(AlertLevel::Critical.as_str(), "critical");
    }
}
