// crates/sweep-core/src/runtime/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured JSON-line events for campaign progress and recovery.
// Purpose: Emit harness logs without hard dependencies on a logging stack.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every observable harness action (suite start, worker spawn, hang recovery,
//! export) is recorded as a [`HarnessEvent`] through an [`EventSink`]. Sinks
//! serialize one JSON object per line so deployments can route events to
//! their preferred pipeline without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::ModuleName;
use crate::core::SuiteName;
use crate::core::TestStatus;
use crate::core::VectorId;

// ============================================================================
// SECTION: Event Payload
// ============================================================================

/// Harness event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarnessEvent {
    /// Stable event label.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Module the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Suite the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    /// Vector the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_id: Option<String>,
    /// Vector status for completion events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TestStatus>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Count attached to summary events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Worker process identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl HarnessEvent {
    /// Creates a new event with a consistent timestamp.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            module: None,
            suite: None,
            vector_id: None,
            status: None,
            message: None,
            count: None,
            pid: None,
        }
    }

    /// Attaches a module name.
    #[must_use]
    pub fn with_module(mut self, module: &ModuleName) -> Self {
        self.module = Some(module.to_string());
        self
    }

    /// Attaches a suite name.
    #[must_use]
    pub fn with_suite(mut self, suite: &SuiteName) -> Self {
        self.suite = Some(suite.to_string());
        self
    }

    /// Attaches a vector identifier.
    #[must_use]
    pub fn with_vector(mut self, vector_id: &VectorId) -> Self {
        self.vector_id = Some(vector_id.to_string());
        self
    }

    /// Attaches a vector status.
    #[must_use]
    pub const fn with_status(mut self, status: TestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches a count.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches a worker process identifier.
    #[must_use]
    pub const fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for harness events.
pub trait EventSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &HarnessEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that logs JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
        }
    }
}

/// Sink that discards events.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events, in order.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns how many events carry the given label.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|event| event.event == label).count())
            .unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
