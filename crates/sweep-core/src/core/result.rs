// crates/sweep-core/src/core/result.rs
// ============================================================================
// Module: Sweep Results
// Description: Status taxonomy, device outcomes, and stored result records.
// Purpose: Give every vector exactly one terminal, serializable outcome.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`TestStatus`] is the terminal state of one vector. Devices report a
//! [`RunReport`] or an [`ExecutionFailure`]; the worker carries either across
//! the process boundary as a [`WorkerReply`]; the suite executor turns the
//! reply into an [`ExecutionResult`]; the exporter merges that with the
//! vector header into a [`ResultRecord`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::classify::FailureKind;
use crate::core::vector::VectorHeader;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message recorded when a worker produced no response within the timeout.
pub const HANG_MESSAGE: &str = "TEST TIMED OUT (CRASH / HANG)";
/// Message recorded when a worker exited before responding.
pub const CRASH_MESSAGE: &str = "WORKER EXITED WITHOUT RESPONSE (CRASH / HANG)";

// ============================================================================
// SECTION: Status Taxonomy
// ============================================================================

/// Terminal status of one vector execution.
///
/// # Invariants
/// - Every status is terminal; the harness never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// Vector was invalid and never reached a device.
    #[serde(alias = "TestStatus.NOT_RUN")]
    NotRun,
    /// Operation completed and reported success.
    #[serde(alias = "TestStatus.PASS")]
    Pass,
    /// Operation raised an error or failed an assertion.
    #[serde(alias = "TestStatus.FAIL_ASSERT_EXCEPTION")]
    FailAssertException,
    /// Operation could not allocate L1 memory.
    #[serde(alias = "TestStatus.FAIL_L1_OUT_OF_MEM")]
    FailL1OutOfMem,
    /// Device watcher reported a fault.
    #[serde(alias = "TestStatus.FAIL_WATCHER")]
    FailWatcher,
    /// Worker hung or crashed.
    #[serde(alias = "TestStatus.FAIL_CRASH_HANG")]
    FailCrashHang,
}

impl TestStatus {
    /// All statuses in declaration order.
    pub const ALL: [Self; 6] = [
        Self::NotRun,
        Self::Pass,
        Self::FailAssertException,
        Self::FailL1OutOfMem,
        Self::FailWatcher,
        Self::FailCrashHang,
    ];

    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRun => "NOT_RUN",
            Self::Pass => "PASS",
            Self::FailAssertException => "FAIL_ASSERT_EXCEPTION",
            Self::FailL1OutOfMem => "FAIL_L1_OUT_OF_MEM",
            Self::FailWatcher => "FAIL_WATCHER",
            Self::FailCrashHang => "FAIL_CRASH_HANG",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Device Outcomes
// ============================================================================

/// Successful device execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    /// Human-readable message from the operation.
    pub message: String,
    /// End-to-end duration, when the operation measured one.
    pub e2e_perf: Option<Duration>,
}

/// Failed device execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    /// Structured failure kind, when the device reports one.
    pub kind: Option<FailureKind>,
    /// Error text.
    pub message: String,
}

impl ExecutionFailure {
    /// Creates a failure without a structured kind.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
        }
    }

    /// Creates a failure with a structured kind.
    #[must_use]
    pub fn with_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: message.into(),
        }
    }
}

/// Reply a worker sends for one executed vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    /// True when the operation succeeded.
    pub status: bool,
    /// Operation message or error text.
    pub message: String,
    /// End-to-end duration in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e2e_perf_ns: Option<u64>,
    /// Structured failure kind for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
}

impl WorkerReply {
    /// Converts a device outcome into a reply.
    #[must_use]
    pub fn from_outcome(outcome: Result<RunReport, ExecutionFailure>) -> Self {
        match outcome {
            Ok(report) => Self {
                status: true,
                message: report.message,
                e2e_perf_ns: report
                    .e2e_perf
                    .map(|perf| u64::try_from(perf.as_nanos()).unwrap_or(u64::MAX)),
                failure_kind: None,
            },
            Err(failure) => Self {
                status: false,
                message: failure.message,
                e2e_perf_ns: None,
                failure_kind: failure.kind,
            },
        }
    }

    /// Creates a failed reply with no structured kind.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::from_outcome(Err(ExecutionFailure::message(message)))
    }

    /// Returns the end-to-end duration in milliseconds.
    #[must_use]
    pub fn e2e_perf_ms(&self) -> Option<f64> {
        self.e2e_perf_ns.map(|nanos| Duration::from_nanos(nanos).as_secs_f64() * 1_000.0)
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Outcome of one vector, produced by the suite executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Terminal status.
    pub status: TestStatus,
    /// Operation message or failure text.
    pub message: String,
    /// End-to-end duration in milliseconds (perf mode only).
    pub e2e_perf: Option<f64>,
    /// Completion timestamp (`YYYY-MM-DD_HH-MM-SS`).
    pub timestamp: String,
    /// Host that executed the vector.
    pub host: String,
    /// User that ran the harness.
    pub user: String,
}

/// Durable result document keyed by vector identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Vector identity header.
    #[serde(flatten)]
    pub header: VectorHeader,
    /// Terminal status.
    pub status: TestStatus,
    /// Operation message or failure text.
    pub message: String,
    /// End-to-end duration in milliseconds.
    #[serde(default)]
    pub e2e_perf: Option<f64>,
    /// Completion timestamp.
    pub timestamp: String,
    /// Executing host.
    pub host: String,
    /// Executing user.
    pub user: String,
    /// Source-control revision of the harness run.
    pub git_hash: String,
}

impl ResultRecord {
    /// Merges a vector header with its execution result.
    #[must_use]
    pub fn merge(header: VectorHeader, result: ExecutionResult, git_hash: &str) -> Self {
        Self {
            header,
            status: result.status,
            message: result.message,
            e2e_perf: result.e2e_perf,
            timestamp: result.timestamp,
            host: result.host,
            user: result.user,
            git_hash: git_hash.to_string(),
        }
    }
}
