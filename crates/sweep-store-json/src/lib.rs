// crates/sweep-store-json/src/lib.rs
// ============================================================================
// Module: Sweep JSON Store Library
// Description: Flat structured file backend for vectors and results.
// Purpose: Run sweeps without a document-search service.
// Dependencies: sweep-core, serde_json
// ============================================================================

//! ## Overview
//! `sweep-store-json` implements [`sweep_core::VectorStore`] and
//! [`sweep_core::ResultStore`] over a single JSON file with two top-level
//! maps, `serialized_vectors` and `results`, both keyed by vector id.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::JsonFileStore;
pub use store::JsonStoreError;
