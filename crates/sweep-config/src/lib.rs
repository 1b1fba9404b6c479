// crates/sweep-config/src/lib.rs
// ============================================================================
// Module: Sweep Config Library
// Description: Canonical config model and validation for the sweep harness.
// Purpose: Single source of truth for sweep-harness.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `sweep-config` defines the configuration model for the sweep harness:
//! store backend selection, execution timeouts, the hardware reset utility,
//! watcher settings, device host commands, per-module overrides, and event
//! logging. Loading is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
