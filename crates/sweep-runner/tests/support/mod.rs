// crates/sweep-runner/tests/support/mod.rs
// ============================================================================
// Module: Runner Test Support
// Description: Scripted workers, modules, and reset utilities.
// ============================================================================
//! ## Overview
//! Fakes whose behavior is chosen per vector through a `mode` parameter:
//! `pass`, `fail` (with `message`), `hang`, `crash`, or `panic`.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Shared fixtures; not every test binary uses every helper."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use sweep_core::DeviceError;
use sweep_core::DeviceOptions;
use sweep_core::DeviceReset;
use sweep_core::DeviceSession;
use sweep_core::ExecutionFailure;
use sweep_core::ModuleName;
use sweep_core::ResetError;
use sweep_core::RunReport;
use sweep_core::StoredVector;
use sweep_core::SweepModule;
use sweep_core::VectorParams;
use sweep_core::WorkerError;
use sweep_core::WorkerHandle;
use sweep_core::WorkerReply;
use sweep_core::WorkerSpawner;

// ============================================================================
// SECTION: Vectors
// ============================================================================

/// Builds a valid stored vector with the given mode.
pub fn valid(module: &str, suite: &str, id: &str, mode: &str) -> StoredVector {
    StoredVector::from_document(
        id,
        json!({
            "module_name": module,
            "suite_name": suite,
            "validity": "VALID",
            "status": "CURRENT",
            "mode": mode,
            "tag": id,
        }),
    )
    .unwrap()
}

/// Builds an invalid stored vector.
pub fn invalid(module: &str, suite: &str, id: &str, reason: &str) -> StoredVector {
    StoredVector::from_document(
        id,
        json!({
            "module_name": module,
            "suite_name": suite,
            "validity": "INVALID",
            "invalid_reason": reason,
            "status": "CURRENT",
            "mode": "pass",
        }),
    )
    .unwrap()
}

fn mode(params: &VectorParams) -> &str {
    params.get("mode").and_then(Value::as_str).unwrap_or("pass")
}

/// Runs one scripted call; the `call`-th success reports `4 * call` ms.
fn scripted_outcome(params: &VectorParams, call: u64) -> Result<RunReport, ExecutionFailure> {
    match mode(params) {
        "fail" => Err(ExecutionFailure::message(
            params.get("message").and_then(Value::as_str).unwrap_or("assertion failed"),
        )),
        "panic" => panic!("device exploded"),
        _ => Ok(RunReport {
            message: "ok".to_string(),
            e2e_perf: Some(Duration::from_millis(4 * call)),
        }),
    }
}

// ============================================================================
// SECTION: Workers
// ============================================================================

/// Everything the fake workers observed.
#[derive(Debug, Default)]
pub struct WorkerLog {
    /// Number of workers spawned.
    pub spawned: usize,
    /// Parameters submitted, in order.
    pub submitted: Vec<VectorParams>,
    /// Number of workers terminated.
    pub terminated: usize,
    /// Number of workers stopped gracefully.
    pub stopped: usize,
}

/// Spawner whose workers follow the `mode` parameter.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSpawner {
    /// Shared observation log.
    pub log: Arc<Mutex<WorkerLog>>,
    /// Fail every spawn.
    pub refuse: bool,
}

impl ScriptedSpawner {
    /// Returns a snapshot of `(spawned, submitted, terminated, stopped)`.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let log = self.log.lock().unwrap();
        (log.spawned, log.submitted.len(), log.terminated, log.stopped)
    }

    /// Returns the `tag` of every submitted vector, in submission order.
    pub fn submitted_tags(&self) -> Vec<String> {
        let log = self.log.lock().unwrap();
        log.submitted
            .iter()
            .map(|params| params.get("tag").and_then(Value::as_str).unwrap_or("").to_string())
            .collect()
    }
}

impl WorkerSpawner for ScriptedSpawner {
    fn spawn(&self, _module: &ModuleName) -> Result<Box<dyn WorkerHandle>, WorkerError> {
        if self.refuse {
            return Err(WorkerError::Spawn("no worker binary".to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.spawned += 1;
        let pid = 1000 + u32::try_from(log.spawned).unwrap();
        drop(log);
        Ok(Box::new(ScriptedWorker {
            pid,
            log: Arc::clone(&self.log),
            pending: Vec::new(),
            replies: 0,
        }))
    }
}

struct ScriptedWorker {
    pid: u32,
    log: Arc<Mutex<WorkerLog>>,
    pending: Vec<VectorParams>,
    replies: u64,
}

impl WorkerHandle for ScriptedWorker {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn submit(&mut self, params: &VectorParams) -> Result<(), WorkerError> {
        self.log.lock().unwrap().submitted.push(params.clone());
        self.pending.push(params.clone());
        Ok(())
    }

    fn await_reply(&mut self, timeout: Duration) -> Result<WorkerReply, WorkerError> {
        let params = self.pending.remove(0);
        self.replies += 1;
        match mode(&params) {
            "hang" => Err(WorkerError::TimedOut(timeout)),
            "crash" => Err(WorkerError::Exited("worker exited with signal 11".to_string())),
            "panic" => Ok(WorkerReply::failed("device exploded")),
            _ => Ok(WorkerReply::from_outcome(scripted_outcome(&params, self.replies))),
        }
    }

    fn terminate(self: Box<Self>) -> Result<(), WorkerError> {
        self.log.lock().unwrap().terminated += 1;
        Ok(())
    }

    fn stop(self: Box<Self>) -> Result<(), WorkerError> {
        self.log.lock().unwrap().stopped += 1;
        Ok(())
    }
}

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Module whose in-process device follows the `mode` parameter.
#[derive(Debug, Clone)]
pub struct ScriptedModule {
    /// Module name.
    pub name: ModuleName,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Fail to open the device.
    pub broken_device: bool,
    /// Executions performed in-process.
    pub executions: Arc<Mutex<usize>>,
}

impl ScriptedModule {
    /// Creates a module with a working device.
    pub fn new(name: &str) -> Self {
        Self {
            name: ModuleName::from(name),
            timeout: None,
            broken_device: false,
            executions: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns the number of in-process executions.
    pub fn executions(&self) -> usize {
        *self.executions.lock().unwrap()
    }
}

impl SweepModule for ScriptedModule {
    fn name(&self) -> &ModuleName {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn open_device(&self, _options: &DeviceOptions) -> Result<Box<dyn DeviceSession>, DeviceError> {
        if self.broken_device {
            return Err(DeviceError::Open("no device on bus".to_string()));
        }
        Ok(Box::new(ScriptedDevice {
            executions: Arc::clone(&self.executions),
        }))
    }
}

struct ScriptedDevice {
    executions: Arc<Mutex<usize>>,
}

impl DeviceSession for ScriptedDevice {
    fn label(&self) -> &str {
        "scripted"
    }

    fn execute(&mut self, params: &VectorParams) -> Result<RunReport, ExecutionFailure> {
        let mut executions = self.executions.lock().unwrap();
        *executions += 1;
        let call = u64::try_from(*executions).unwrap();
        drop(executions);
        scripted_outcome(params, call)
    }

    fn close(self: Box<Self>) -> Result<(), DeviceError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Reset
// ============================================================================

/// Reset utility that records each device class it is asked to reset.
#[derive(Debug, Default)]
pub struct RecordingReset {
    /// Device classes reset, in order.
    pub calls: Mutex<Vec<String>>,
}

impl RecordingReset {
    /// Returns the number of resets.
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DeviceReset for RecordingReset {
    fn reset(&self, device_class: &str) -> Result<(), ResetError> {
        self.calls.lock().unwrap().push(device_class.to_string());
        Ok(())
    }
}
