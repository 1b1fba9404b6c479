// crates/sweep-core/src/runtime/mod.rs
// ============================================================================
// Module: Sweep Core Runtime Helpers
// Description: In-memory store and structured event sinks.
// Purpose: Provide dependency-free implementations for tests and logging.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime helpers shared by every harness crate: an in-memory
//! [`crate::SweepStore`] for tests and demos, and the JSON-line event sinks
//! used for harness logging.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::EventSink;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use store::InMemorySweepStore;
