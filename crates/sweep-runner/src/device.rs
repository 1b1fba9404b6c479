// crates/sweep-runner/src/device.rs
// ============================================================================
// Module: Command-Backed Devices
// Description: Sweep modules whose device lives behind a host process.
// Purpose: Reach a device through a framed pipe to an external program.
// Dependencies: sweep-core, crate::protocol
// ============================================================================

//! ## Overview
//! A [`CommandModule`] opens its device by spawning a device host program;
//! the resulting [`CommandDevice`] owns that child for the whole session.
//! Each execution is one framed [`DeviceRequest`] answered by one framed
//! [`WorkerReply`]. Closing the session closes the host's stdin and waits for
//! it to exit; dropping an unclosed session kills the host.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufReader;
use std::process::Child;
use std::process::ChildStdin;
use std::process::ChildStdout;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;

use sweep_core::DeviceError;
use sweep_core::DeviceOptions;
use sweep_core::DeviceSession;
use sweep_core::ExecutionFailure;
use sweep_core::ModuleName;
use sweep_core::RunReport;
use sweep_core::SweepModule;
use sweep_core::VectorParams;
use sweep_core::WorkerReply;

use crate::protocol::DeviceRequest;
use crate::protocol::read_message;
use crate::protocol::write_message;

// ============================================================================
// SECTION: Module
// ============================================================================

/// Sweep module reached through a device host command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandModule {
    /// Module name.
    name: ModuleName,
    /// Hang timeout override.
    timeout: Option<Duration>,
    /// Device host argv; the module name is passed as `--module <name>`.
    argv: Vec<String>,
}

impl CommandModule {
    /// Creates a module backed by the given device host argv.
    #[must_use]
    pub const fn new(name: ModuleName, timeout: Option<Duration>, argv: Vec<String>) -> Self {
        Self {
            name,
            timeout,
            argv,
        }
    }

    /// Returns the device host argv.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl SweepModule for CommandModule {
    fn name(&self) -> &ModuleName {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn open_device(&self, options: &DeviceOptions) -> Result<Box<dyn DeviceSession>, DeviceError> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(DeviceError::Open("device command is empty".to_string()));
        };
        let mut child = Command::new(program)
            .args(args)
            .arg("--module")
            .arg(self.name.as_str())
            .envs(options.env.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| DeviceError::Open(format!("{program}: {err}")))?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DeviceError::Open("device host pipes unavailable".to_string()));
        };
        Ok(Box::new(CommandDevice {
            label: format!("{program} ({})", self.name),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        }))
    }
}

// ============================================================================
// SECTION: Device Session
// ============================================================================

/// Open device session backed by a host process.
#[derive(Debug)]
pub struct CommandDevice {
    /// Display label.
    label: String,
    /// Device host process.
    child: Child,
    /// Request pipe; dropped on close.
    stdin: Option<ChildStdin>,
    /// Reply pipe.
    stdout: BufReader<ChildStdout>,
}

impl DeviceSession for CommandDevice {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self, params: &VectorParams) -> Result<RunReport, ExecutionFailure> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ExecutionFailure::message("device host error: session closed"))?;
        let request = DeviceRequest::Execute {
            params: params.clone(),
        };
        write_message(stdin, &request)
            .map_err(|err| ExecutionFailure::message(format!("device host error: {err}")))?;
        let reply: WorkerReply = read_message(&mut self.stdout)
            .map_err(|err| ExecutionFailure::message(format!("device host error: {err}")))?;
        if reply.status {
            Ok(RunReport {
                message: reply.message,
                e2e_perf: reply.e2e_perf_ns.map(Duration::from_nanos),
            })
        } else {
            Err(ExecutionFailure {
                kind: reply.failure_kind,
                message: reply.message,
            })
        }
    }

    fn close(mut self: Box<Self>) -> Result<(), DeviceError> {
        self.stdin.take();
        let status =
            self.child.wait().map_err(|err| DeviceError::Close(format!("{}: {err}", self.label)))?;
        if status.success() {
            Ok(())
        } else {
            Err(DeviceError::Close(format!("{} exited with {status}", self.label)))
        }
    }
}

impl Drop for CommandDevice {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
