// crates/sweep-core/src/interfaces/mod.rs
// ============================================================================
// Module: Sweep Interfaces
// Description: Backend-agnostic interfaces for stores, devices, and workers.
// Purpose: Define the contract surfaces used by the sweep runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the harness integrates with external systems without
//! embedding backend-specific details:
//! - [`VectorStore`] / [`ResultStore`]: durable vectors and idempotent results.
//! - [`SweepModule`] / [`DeviceSession`]: the device and operation API.
//! - [`WorkerSpawner`] / [`WorkerHandle`]: a killable unit of execution with
//!   a bounded request/response channel.
//! - [`DeviceReset`]: the hardware reset utility invoked after a hang.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::core::ExecutionFailure;
use crate::core::ModuleName;
use crate::core::ResultRecord;
use crate::core::RunReport;
use crate::core::StoredVector;
use crate::core::SuiteName;
use crate::core::TestStatus;
use crate::core::VectorId;
use crate::core::VectorParams;
use crate::core::WorkerReply;

// ============================================================================
// SECTION: Stores
// ============================================================================

/// Store errors shared by every backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Module has no vector collection in the store.
    #[error("sweep store not found: {0}")]
    NotFound(String),
    /// Store I/O error.
    #[error("sweep store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or unparsable.
    #[error("sweep store corruption: {0}")]
    Corrupt(String),
    /// Request or data is invalid.
    #[error("sweep store invalid data: {0}")]
    Invalid(String),
    /// Backend reported an error.
    #[error("sweep store backend error: {0}")]
    Backend(String),
}

/// Read access to persisted test vectors.
pub trait VectorStore {
    /// Lists the suites that hold vectors for a module, in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the module has no vectors and
    /// other variants when the backend fails.
    fn list_suites(&self, module: &ModuleName) -> Result<Vec<SuiteName>, StoreError>;

    /// Fetches the current vectors of one suite in stable order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn fetch_suite(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
    ) -> Result<Vec<StoredVector>, StoreError>;

    /// Fetches a single vector by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn fetch_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Option<StoredVector>, StoreError>;
}

/// Durable, idempotent result storage keyed by vector identifier.
pub trait ResultStore {
    /// Replaces any prior records for the given vector identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn upsert_results(&self, module: &ModuleName, records: &[ResultRecord])
    -> Result<(), StoreError>;

    /// Queries results for a suite, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn query_results(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
        status: Option<TestStatus>,
    ) -> Result<Vec<ResultRecord>, StoreError>;

    /// Returns every record stored for a vector identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn results_for_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Vec<ResultRecord>, StoreError>;
}

/// Combined vector and result store selected once at startup.
pub trait SweepStore: VectorStore + ResultStore {}

impl<T: VectorStore + ResultStore> SweepStore for T {}

// ============================================================================
// SECTION: Devices
// ============================================================================

/// Device lifecycle errors.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device could not be opened.
    #[error("device open failed: {0}")]
    Open(String),
    /// Device could not be closed cleanly.
    #[error("device close failed: {0}")]
    Close(String),
}

/// Options applied when opening a device session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Whether watcher diagnostics are enabled.
    pub watcher: bool,
    /// Extra environment passed to device-side processes.
    pub env: Vec<(String, String)>,
}

/// One open device handle. Exclusively owned; never shared across sessions.
pub trait DeviceSession {
    /// Returns a display label for the device configuration.
    fn label(&self) -> &str;

    /// Executes the module operation once with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionFailure`] when the operation fails.
    fn execute(&mut self, params: &VectorParams) -> Result<RunReport, ExecutionFailure>;

    /// Releases the device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Close`] when release fails.
    fn close(self: Box<Self>) -> Result<(), DeviceError>;
}

/// A sweep module: one operation under test and how to reach its device.
pub trait SweepModule: Send + Sync {
    /// Returns the module name.
    fn name(&self) -> &ModuleName;

    /// Returns the module's hang timeout override, if declared.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Opens a device session for this module.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Open`] when the device is unavailable.
    fn open_device(&self, options: &DeviceOptions) -> Result<Box<dyn DeviceSession>, DeviceError>;
}

// ============================================================================
// SECTION: Workers
// ============================================================================

/// Worker supervision errors.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker could not be started.
    #[error("worker spawn failed: {0}")]
    Spawn(String),
    /// No reply arrived within the timeout.
    #[error("worker timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
    /// Worker exited or closed its channel.
    #[error("worker exited: {0}")]
    Exited(String),
    /// Worker sent an unparsable message.
    #[error("worker protocol error: {0}")]
    Protocol(String),
    /// Worker I/O error.
    #[error("worker io error: {0}")]
    Io(String),
}

/// A live worker owning one device session.
pub trait WorkerHandle {
    /// Returns the OS process identifier, when the worker is a process.
    fn pid(&self) -> Option<u32>;

    /// Sends one vector's parameters to the worker.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] when the request cannot be delivered.
    fn submit(&mut self, params: &VectorParams) -> Result<(), WorkerError>;

    /// Blocks for the next reply, at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::TimedOut`] when nothing arrives in time and
    /// [`WorkerError::Exited`] when the worker is gone.
    fn await_reply(&mut self, timeout: Duration) -> Result<WorkerReply, WorkerError>;

    /// Forcibly kills a wedged worker.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Io`] when the kill fails.
    fn terminate(self: Box<Self>) -> Result<(), WorkerError>;

    /// Sends the stop signal and waits for the worker to release its device.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] when the worker had to be killed or could not
    /// be reaped.
    fn stop(self: Box<Self>) -> Result<(), WorkerError>;
}

/// Starts workers for a module.
pub trait WorkerSpawner {
    /// Spawns a worker that will open its own device session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] when the worker cannot be started.
    fn spawn(&self, module: &ModuleName) -> Result<Box<dyn WorkerHandle>, WorkerError>;
}

// ============================================================================
// SECTION: Hardware Reset
// ============================================================================

/// Reset utility errors.
#[derive(Debug, Error)]
pub enum ResetError {
    /// Reset utility could not be launched.
    #[error("device reset launch failed: {0}")]
    Launch(String),
    /// Reset utility exited unsuccessfully.
    #[error("device reset failed: {0}")]
    Failed(String),
}

/// Hardware reset utility, invoked only after a confirmed hang or crash.
pub trait DeviceReset {
    /// Resets all devices of the given class; blocks until done.
    ///
    /// # Errors
    ///
    /// Returns [`ResetError`] when the utility fails; callers log and go on.
    fn reset(&self, device_class: &str) -> Result<(), ResetError>;
}
