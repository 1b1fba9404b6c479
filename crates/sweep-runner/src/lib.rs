// crates/sweep-runner/src/lib.rs
// ============================================================================
// Module: Sweep Runner Library
// Description: Execution engine for sweep campaigns.
// Purpose: Drive suites through supervised workers and persist every outcome.
// Dependencies: sweep-core, serde_json, time
// ============================================================================

//! ## Overview
//! The runner turns stored vectors into stored results:
//! - [`campaign::CampaignDriver`] enumerates modules and suites.
//! - [`executor::SuiteExecutor`] runs one suite, recovering from hangs by
//!   killing the worker and resetting the device.
//! - [`session::ProcessWorkerSpawner`] starts workers as real processes that
//!   run [`worker::serve_worker`] and speak the framed [`protocol`].
//! - [`export::ResultExporter`] merges headers back and upserts records.
//! - [`device::CommandModule`] and [`reset::CommandReset`] adapt external
//!   device hosts and reset utilities.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod campaign;
pub mod device;
pub mod executor;
pub mod export;
pub mod host;
pub mod protocol;
pub mod reset;
pub mod session;
pub mod worker;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use campaign::CampaignDriver;
pub use campaign::CampaignError;
pub use campaign::CampaignSelection;
pub use campaign::CampaignSummary;
pub use campaign::ModuleRegistry;
pub use campaign::SINGLE_VECTOR_SUITE;
pub use device::CommandDevice;
pub use device::CommandModule;
pub use executor::ExecutorOptions;
pub use executor::SuiteExecutor;
pub use export::ExportError;
pub use export::ResultExporter;
pub use host::HostContext;
pub use host::format_timestamp;
pub use host::git_revision;
pub use protocol::DeviceRequest;
pub use protocol::ProtocolError;
pub use protocol::WorkerRequest;
pub use reset::CommandReset;
pub use reset::NoopReset;
pub use session::ProcessWorker;
pub use session::ProcessWorkerSpawner;
pub use session::WorkerCommand;
pub use worker::execute_guarded;
pub use worker::serve_worker;
