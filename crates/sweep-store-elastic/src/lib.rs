// crates/sweep-store-elastic/src/lib.rs
// ============================================================================
// Module: Sweep Elastic Store Library
// Description: Document-search backend for vectors and results.
// Purpose: Share vectors and results across hosts through one service.
// Dependencies: sweep-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! `sweep-store-elastic` implements [`sweep_core::VectorStore`] and
//! [`sweep_core::ResultStore`] against an Elasticsearch-compatible service.
//! Each module owns one vector index and one result index, named by
//! appending the module name to a configured prefix.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::ElasticSettings;
pub use store::ElasticStore;
pub use store::ElasticStoreError;
pub use reqwest::Url;
