// crates/sweep-core/src/core/classify.rs
// ============================================================================
// Module: Failure Classification
// Description: Maps failed device runs onto the status taxonomy.
// Purpose: Prefer structured failure kinds; fall back to message matching.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A failed run is classified from its structured [`FailureKind`] when the
//! device reports one; the mapping is total. Devices that only return text
//! are classified by ordered substring matching: the L1 allocator message
//! wins over the watcher marker, and anything else is an assertion failure.
//! The ordering is pinned by tests because a message may contain both.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::result::TestStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Substring emitted by the device allocator when L1 is exhausted.
pub const L1_OUT_OF_MEMORY_MARKER: &str = "Out of Memory: Not enough space to allocate";
/// Substring emitted by the device watcher diagnostics.
pub const WATCHER_MARKER: &str = "Watcher";

// ============================================================================
// SECTION: Failure Kinds
// ============================================================================

/// Structured failure kind reported alongside an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// L1 allocation failure.
    OutOfMemory,
    /// Watcher-detected device fault.
    Watcher,
    /// Assertion or generic exception.
    Assertion,
}

impl FailureKind {
    /// Returns the status this failure kind maps to.
    #[must_use]
    pub const fn status(self) -> TestStatus {
        match self {
            Self::OutOfMemory => TestStatus::FailL1OutOfMem,
            Self::Watcher => TestStatus::FailWatcher,
            Self::Assertion => TestStatus::FailAssertException,
        }
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a failure message by ordered substring matching.
#[must_use]
pub fn classify_failure_message(message: &str) -> TestStatus {
    if message.contains(L1_OUT_OF_MEMORY_MARKER) {
        TestStatus::FailL1OutOfMem
    } else if message.contains(WATCHER_MARKER) {
        TestStatus::FailWatcher
    } else {
        TestStatus::FailAssertException
    }
}

/// Classifies a failed run, preferring the structured kind.
#[must_use]
pub fn classify_failure(kind: Option<FailureKind>, message: &str) -> TestStatus {
    kind.map_or_else(|| classify_failure_message(message), FailureKind::status)
}
