//! Error sink adapters

use std::sync::Mutex;

use tracing::error;

use crate::domain::result::Error;
use crate::ports::ErrorSink;

/// Reports errors through `tracing` at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, context: &str, err: &Error) {
        error!(context, error = %err, "background operation failed");
    }
}

/// Keeps reported errors so a front end can show them later
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    reports: Mutex<Vec<(String, String)>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all `(context, message)` pairs reported so far
    pub fn drain(&self) -> Vec<(String, String)> {
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(|p| p.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for MemoryErrorSink {
    fn report(&self, context: &str, err: &Error) {
        self.reports
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((context.to_string(), err.to_string()));
    }
}
