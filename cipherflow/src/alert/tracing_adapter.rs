//! Alert sink backed by the `tracing` log stream.

use tracing::{error, info, warn};

use crate::alert::{AlertLevel, AlertSink};

/// Routes alerts into the process log at the matching severity.
///
/// The default sink for deployments whose alerting pipeline tails
/// structured logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl TracingAlertSink {
    /// Creates the sink.
    pub fn new() -> Self {
        Self
    }
}

impl AlertSink for TracingAlertSink {
    fn notify(&self, level: AlertLevel, message: &str, context: &[(&'static str, String)]) {
        let context = context
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        match level {
            AlertLevel::Info => info!(alert = true, %context, "{}", message),
            AlertLevel::Warning => warn!(alert = true, %context, "{}", message),
            AlertLevel::Critical => error!(alert = true, %context, "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_does_not_panic_without_subscriber() {
        let sink = TracingAlertSink::new();
        sink.notify(
            AlertLevel::Critical,
            "callback failed",
            &[("correlation_id", "ab00".to_string())],
        );
    }
}
