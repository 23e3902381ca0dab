//! Diagnostics sinks.
//!
//! Components never log through a global. Each one is handed an
//! `Arc<dyn DiagnosticsSink>` when it is built and records through it.

use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Per-tick detail.
    Trace,
    /// Lifecycle detail.
    Debug,
    /// Normal operation.
    Info,
    /// Rejected commands and recoverable trouble.
    Warn,
    /// Faults.
    Error,
}

/// Destination for diagnostic records.
pub trait DiagnosticsSink: Send + Sync {
    /// Record one message.
    fn record(&self, level: Level, message: &str);
}

/// Forwards records to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, level: Level, message: &str) {
        match level {
            Level::Trace => tracing::trace!("{}", message),
            Level::Debug => tracing::debug!("{}", message),
            Level::Info => tracing::info!("{}", message),
            Level::Warn => tracing::warn!("{}", message),
            Level::Error => tracing::error!("{}", message),
        }
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&self, _level: Level, _message: &str) {}
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, level: Level, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_owned()));
    }
}

/// The sink used when a builder is not given one.
pub fn default_sink() -> Arc<dyn DiagnosticsSink> {
    Arc::new(TracingSink)
}
