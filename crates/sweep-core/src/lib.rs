// crates/sweep-core/src/lib.rs
// ============================================================================
// Module: Sweep Core Library
// Description: Public API surface for the sweep harness core.
// Purpose: Expose the data model, status taxonomy, and integration interfaces.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Sweep core defines the vocabulary shared by every part of the sweep test
//! harness: test vectors and their headers, execution results and the status
//! taxonomy, failure classification, and the trait seams through which the
//! harness talks to result stores, devices, workers, reset utilities, and
//! event sinks. It is backend-agnostic; concrete backends live in sibling
//! crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::DeviceError;
pub use interfaces::DeviceOptions;
pub use interfaces::DeviceReset;
pub use interfaces::DeviceSession;
pub use interfaces::ResetError;
pub use interfaces::ResultStore;
pub use interfaces::StoreError;
pub use interfaces::SweepModule;
pub use interfaces::SweepStore;
pub use interfaces::VectorStore;
pub use interfaces::WorkerError;
pub use interfaces::WorkerHandle;
pub use interfaces::WorkerSpawner;
pub use runtime::EventSink;
pub use runtime::FileEventSink;
pub use runtime::HarnessEvent;
pub use runtime::InMemorySweepStore;
pub use runtime::MemoryEventSink;
pub use runtime::NoopEventSink;
pub use runtime::StderrEventSink;
