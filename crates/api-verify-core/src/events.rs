// crates/api-verify-core/src/events.rs
// ============================================================================
// Module: Run Events
// Description: Structured progress events emitted while a suite runs.
// Purpose: Emit JSON-line run logs without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The runner reports progress as [`RunEvent`]s to a [`RunEventSink`]. Sinks
//! write one JSON object per line so logs can be routed to any pipeline.
//! Events carry statuses, sizes and timings only; request and response bodies
//! are never logged.

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

use crate::report::StepStatus;
use crate::report::duration_millis;
use crate::report::Verdict;
use crate::scenario::BackendMode;
use crate::transport::Method;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEventKind {
    /// A scenario is about to issue its first request.
    ScenarioStarted {
        /// Scenario name.
        scenario: String,
        /// Number of declared steps.
        steps: usize,
    },
    /// A step finished, successfully or not.
    StepCompleted {
        /// Scenario name.
        scenario: String,
        /// Step label.
        step: String,
        /// HTTP method.
        method: Method,
        /// Resolved request path when resolution succeeded.
        path: Option<String>,
        /// Response status when a response arrived.
        status: Option<u16>,
        /// Step result.
        result: StepStatus,
        /// Received body size in bytes when a response arrived.
        response_bytes: Option<usize>,
        /// Elapsed time in milliseconds.
        duration_ms: u64,
    },
    /// A scenario produced its verdict.
    ScenarioFinished {
        /// Scenario name.
        scenario: String,
        /// Final verdict.
        verdict: Verdict,
        /// Number of recorded failures.
        failures: usize,
        /// Elapsed time in milliseconds.
        duration_ms: u64,
    },
    /// All scenarios ran.
    SuiteFinished {
        /// Backend mode applied to durability checks.
        backend: BackendMode,
        /// Scenario count.
        total: usize,
        /// Passing scenarios.
        passed: usize,
        /// Failing scenarios.
        failed: usize,
        /// Elapsed time in milliseconds.
        duration_ms: u64,
    },
}

/// A timestamped run event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Event payload.
    #[serde(flatten)]
    pub kind: RunEventKind,
}

impl RunEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn now(kind: RunEventKind) -> Self {
        let timestamp_ms =
            duration_millis(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default());
        Self {
            timestamp_ms,
            kind,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for run events.
pub trait RunEventSink: Send + Sync {
    /// Record an event. Sinks swallow their own I/O failures.
    fn record(&self, event: &RunEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl RunEventSink for StderrEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
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

impl RunEventSink for FileEventSink {
    fn record(&self, event: &RunEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
        }
    }
}

/// Sink that discards events.
pub struct NoopEventSink;

impl RunEventSink for NoopEventSink {
    fn record(&self, _event: &RunEvent) {}
}

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Captured events in arrival order.
    events: Mutex<Vec<RunEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the captured events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().map_or_else(|_| Vec::new(), |events| events.clone())
    }
}

impl RunEventSink for MemoryEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
