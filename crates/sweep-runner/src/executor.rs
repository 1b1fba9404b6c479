// crates/sweep-runner/src/executor.rs
// ============================================================================
// Module: Suite Executor
// Description: Runs one suite through a supervised worker.
// Purpose: Produce exactly one result per vector whatever the worker does.
// Dependencies: sweep-core, crate::{host, worker}
// ============================================================================

//! ## Overview
//! The executor walks a suite in order. Invalid vectors become `NOT_RUN`
//! without touching a worker. Valid vectors go to a lazily spawned worker and
//! the executor waits for the reply with the module's timeout. A timeout or a
//! dead worker is recorded as `FAIL_CRASH_HANG`; the worker is killed, the
//! device is reset, and the next vector spawns a fresh worker.
//!
//! A suite holding exactly one vector runs in the calling process instead.
//! That path keeps debuggers usable and has no hang recovery.
//!
//! Security posture: device code is untrusted to terminate; every wait on a
//! worker is bounded by the timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use sweep_core::CRASH_MESSAGE;
use sweep_core::DeviceOptions;
use sweep_core::DeviceReset;
use sweep_core::EventSink;
use sweep_core::ExecutionResult;
use sweep_core::HANG_MESSAGE;
use sweep_core::HarnessEvent;
use sweep_core::SuiteVectors;
use sweep_core::SweepModule;
use sweep_core::TestStatus;
use sweep_core::TestVector;
use sweep_core::VectorHeader;
use sweep_core::VectorParams;
use sweep_core::WorkerError;
use sweep_core::WorkerHandle;
use sweep_core::WorkerReply;
use sweep_core::WorkerSpawner;
use sweep_core::classify_failure;

use crate::host::HostContext;
use crate::worker::execute_guarded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hang timeout used when neither the module nor the config sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Options
// ============================================================================

/// Run-wide execution switches threaded through every suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Submit each vector twice and keep the second run's timing.
    pub perf: bool,
    /// Log intended executions without running anything.
    pub dry_run: bool,
    /// Hang timeout for modules without an override.
    pub default_timeout: Duration,
    /// Device class passed to the reset utility.
    pub device_class: String,
    /// Options for devices opened in-process.
    pub device_options: DeviceOptions,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            perf: false,
            dry_run: false,
            default_timeout: DEFAULT_TIMEOUT,
            device_class: String::new(),
            device_options: DeviceOptions::default(),
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Classified outcome before provenance is attached.
struct Outcome {
    /// Terminal status.
    status: TestStatus,
    /// Result message.
    message: String,
    /// Timing in milliseconds.
    e2e_perf: Option<f64>,
}

impl Outcome {
    /// Outcome without timing.
    fn new(status: TestStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            e2e_perf: None,
        }
    }

    /// Classifies a worker reply; timing is kept only in perf mode.
    fn from_reply(reply: &WorkerReply, perf: bool) -> Self {
        if reply.status {
            Self {
                status: TestStatus::Pass,
                message: reply.message.clone(),
                e2e_perf: if perf { reply.e2e_perf_ms() } else { None },
            }
        } else {
            Self::new(classify_failure(reply.failure_kind, &reply.message), reply.message.clone())
        }
    }
}

// ============================================================================
// SECTION: Suite Executor
// ============================================================================

/// Executes suites against one module.
pub struct SuiteExecutor<'a> {
    /// Worker factory.
    spawner: &'a dyn WorkerSpawner,
    /// Hardware reset utility.
    reset: &'a dyn DeviceReset,
    /// Event sink.
    events: &'a dyn EventSink,
    /// Provenance for results.
    host: &'a HostContext,
    /// Execution switches.
    options: ExecutorOptions,
}

impl<'a> SuiteExecutor<'a> {
    /// Creates an executor.
    #[must_use]
    pub const fn new(
        spawner: &'a dyn WorkerSpawner,
        reset: &'a dyn DeviceReset,
        events: &'a dyn EventSink,
        host: &'a HostContext,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            spawner,
            reset,
            events,
            host,
            options,
        }
    }

    /// Returns the execution switches.
    #[must_use]
    pub const fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Runs every vector of a suite and returns results in suite order.
    ///
    /// Dry runs return no results.
    #[must_use]
    pub fn execute(&self, module: &dyn SweepModule, suite: &SuiteVectors) -> Vec<ExecutionResult> {
        if self.options.dry_run {
            for header in &suite.headers {
                self.events.record(
                    &HarnessEvent::new("dry_run_vector")
                        .with_module(&suite.module)
                        .with_suite(&suite.suite)
                        .with_vector(&header.vector_id),
                );
            }
            return Vec::new();
        }
        if suite.len() == 1 {
            return self.execute_in_process(module, suite);
        }
        let timeout = module.timeout().unwrap_or(self.options.default_timeout);
        let mut worker: Option<Box<dyn WorkerHandle>> = None;
        let mut results = Vec::with_capacity(suite.len());
        for (header, vector) in suite.headers.iter().zip(&suite.vectors) {
            let outcome = match invalid_outcome(vector) {
                Some(outcome) => outcome,
                None => self.run_supervised(module, &mut worker, &vector.params, timeout),
            };
            results.push(self.finish(suite, header, outcome));
        }
        if let Some(handle) = worker.take() {
            let event = HarnessEvent::new("worker_stopped")
                .with_module(&suite.module)
                .with_suite(&suite.suite)
                .with_pid(handle.pid());
            match handle.stop() {
                Ok(()) => self.events.record(&event),
                Err(err) => self.events.record(&event.with_message(err.to_string())),
            }
        }
        results
    }

    /// Runs a single-vector suite in the calling process.
    fn execute_in_process(
        &self,
        module: &dyn SweepModule,
        suite: &SuiteVectors,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(1);
        for (header, vector) in suite.headers.iter().zip(&suite.vectors) {
            let outcome = match invalid_outcome(vector) {
                Some(outcome) => outcome,
                None => {
                    self.events.record(
                        &HarnessEvent::new("in_process_execution")
                            .with_module(&suite.module)
                            .with_suite(&suite.suite)
                            .with_vector(&header.vector_id)
                            .with_message("hang detection disabled"),
                    );
                    self.run_in_process(module, &vector.params)
                }
            };
            results.push(self.finish(suite, header, outcome));
        }
        results
    }

    /// Opens a device, executes the vector (twice in perf mode), and closes it.
    fn run_in_process(&self, module: &dyn SweepModule, params: &VectorParams) -> Outcome {
        let mut session = match module.open_device(&self.options.device_options) {
            Ok(session) => session,
            Err(err) => return Outcome::from_reply(&WorkerReply::failed(err.to_string()), false),
        };
        if self.options.perf {
            let _ = execute_guarded(session.as_mut(), params);
        }
        let reply = execute_guarded(session.as_mut(), params);
        if let Err(err) = session.close() {
            self.events.record(
                &HarnessEvent::new("device_close_failed")
                    .with_module(module.name())
                    .with_message(err.to_string()),
            );
        }
        Outcome::from_reply(&reply, self.options.perf)
    }

    /// Sends a vector to the live worker, spawning one when needed.
    fn run_supervised(
        &self,
        module: &dyn SweepModule,
        worker: &mut Option<Box<dyn WorkerHandle>>,
        params: &VectorParams,
        timeout: Duration,
    ) -> Outcome {
        if worker.is_none() {
            match self.spawner.spawn(module.name()) {
                Ok(handle) => {
                    self.events.record(
                        &HarnessEvent::new("worker_spawned")
                            .with_module(module.name())
                            .with_pid(handle.pid()),
                    );
                    *worker = Some(handle);
                }
                Err(err) => return Outcome::new(TestStatus::FailCrashHang, err.to_string()),
            }
        }
        let exchanged = match worker.as_mut() {
            Some(handle) => self.exchange(handle.as_mut(), params, timeout),
            None => Err(WorkerError::Spawn("worker unavailable".to_string())),
        };
        match exchanged {
            Ok(reply) => Outcome::from_reply(&reply, self.options.perf),
            Err(err) => {
                let message =
                    if matches!(err, WorkerError::TimedOut(_)) { HANG_MESSAGE } else { CRASH_MESSAGE };
                self.recover(module, worker.take(), &err);
                Outcome::new(TestStatus::FailCrashHang, message)
            }
        }
    }

    /// Submits a vector and waits for its reply; perf mode adds a warm-up.
    fn exchange(
        &self,
        handle: &mut dyn WorkerHandle,
        params: &VectorParams,
        timeout: Duration,
    ) -> Result<WorkerReply, WorkerError> {
        if self.options.perf {
            handle.submit(params)?;
            handle.await_reply(timeout)?;
        }
        handle.submit(params)?;
        handle.await_reply(timeout)
    }

    /// Kills a wedged worker and resets the device.
    fn recover(
        &self,
        module: &dyn SweepModule,
        handle: Option<Box<dyn WorkerHandle>>,
        cause: &WorkerError,
    ) {
        if let Some(handle) = handle {
            let event = HarnessEvent::new("worker_terminated")
                .with_module(module.name())
                .with_pid(handle.pid());
            match handle.terminate() {
                Ok(()) => self.events.record(&event.with_message(cause.to_string())),
                Err(err) => self.events.record(&event.with_message(format!("{cause}; {err}"))),
            }
        }
        let event = HarnessEvent::new("device_reset")
            .with_module(module.name())
            .with_message(self.options.device_class.clone());
        match self.reset.reset(&self.options.device_class) {
            Ok(()) => self.events.record(&event),
            Err(err) => self.events.record(&event.with_message(err.to_string())),
        }
    }

    /// Attaches provenance and logs the completed vector.
    fn finish(&self, suite: &SuiteVectors, header: &VectorHeader, outcome: Outcome) -> ExecutionResult {
        self.events.record(
            &HarnessEvent::new("vector_completed")
                .with_module(&suite.module)
                .with_suite(&suite.suite)
                .with_vector(&header.vector_id)
                .with_status(outcome.status),
        );
        ExecutionResult {
            status: outcome.status,
            message: outcome.message,
            e2e_perf: outcome.e2e_perf,
            timestamp: self.host.timestamp(),
            host: self.host.host.clone(),
            user: self.host.user.clone(),
        }
    }
}

/// Returns the `NOT_RUN` outcome for an invalid vector.
fn invalid_outcome(vector: &TestVector) -> Option<Outcome> {
    (!vector.is_valid()).then(|| {
        Outcome::new(TestStatus::NotRun, vector.invalid_reason.clone().unwrap_or_default())
    })
}
