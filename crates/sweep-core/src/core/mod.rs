// crates/sweep-core/src/core/mod.rs
// ============================================================================
// Module: Sweep Core Types
// Description: Identifiers, vectors, results, and failure classification.
// Purpose: Define the canonical data model for sweep campaigns.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types are plain serializable data. They carry no behavior beyond
//! construction helpers and the status classification rules, so every backend
//! and transport agrees on a single shape.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod classify;
pub mod identifiers;
pub mod result;
pub mod vector;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use classify::FailureKind;
pub use classify::L1_OUT_OF_MEMORY_MARKER;
pub use classify::WATCHER_MARKER;
pub use classify::classify_failure;
pub use classify::classify_failure_message;
pub use identifiers::ModuleName;
pub use identifiers::SuiteName;
pub use identifiers::VectorId;
pub use result::CRASH_MESSAGE;
pub use result::ExecutionFailure;
pub use result::ExecutionResult;
pub use result::HANG_MESSAGE;
pub use result::ResultRecord;
pub use result::RunReport;
pub use result::TestStatus;
pub use result::WorkerReply;
pub use vector::StoredVector;
pub use vector::SuiteVectors;
pub use vector::TestVector;
pub use vector::VectorHeader;
pub use vector::VectorParams;
pub use vector::VectorStatus;
pub use vector::VectorValidity;
