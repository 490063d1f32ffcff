//! No-op and recording alert sinks.

use std::sync::Mutex;

use crate::alert::{AlertLevel, AlertSink};

/// Discards every alert. For embedders that wire their own failure
/// surfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertSink;

impl NoopAlertSink {
    /// Creates the sink.
    pub fn new() -> Self {
        Self
    }
}

impl AlertSink for NoopAlertSink {
    fn notify(&self, _level: AlertLevel, _message: &str, _context: &[(&'static str, String)]) {}
}

/// One captured alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAlert {
    /// Severity it was raised at.
    pub level: AlertLevel,
    /// Alert message.
    pub message: String,
    /// Context fields as delivered.
    pub context: Vec<(&'static str, String)>,
}

/// Captures alerts in memory for assertions.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    captured: Mutex<Vec<CapturedAlert>>,
}

impl RecordingAlertSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts captured so far.
    pub fn captured(&self) -> Vec<CapturedAlert> {
        self.captured.lock().expect("alert lock poisoned").clone()
    }

    /// Number of alerts captured so far.
    pub fn len(&self) -> usize {
        self.captured.lock().expect("alert lock poisoned").len()
    }

    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for RecordingAlertSink {
    fn notify(&self, level: AlertLevel, message: &str, context: &[(&'static str, String)]) {
        self.captured
            .lock()
            .expect("alert lock poisoned")
            .push(CapturedAlert {
                level,
                message: message.to_string(),
                context: context.to_vec(),
            });
    }
}
