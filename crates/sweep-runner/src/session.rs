// crates/sweep-runner/src/session.rs
// ============================================================================
// Module: Process Worker Sessions
// Description: Spawns worker processes and supervises their replies.
// Purpose: Give the suite executor a killable worker with bounded waits.
// Dependencies: sweep-core, crate::protocol
// ============================================================================

//! ## Overview
//! A [`ProcessWorker`] is a child process running the hidden worker
//! subcommand. Requests go to its stdin; a dedicated reader thread decodes
//! replies from its stdout into a channel so the harness can wait with
//! `recv_timeout`. A timeout means the worker is wedged and it is killed; a
//! disconnected channel means it exited. Stopping closes stdin and gives the
//! worker a grace period to release its device before it is killed.
//!
//! On Unix each worker leads its own process group, so killing a worker also
//! kills the device host it started; a wedged host never outlives its worker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufReader;
use std::io::ErrorKind;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Child;
use std::process::ChildStdin;
use std::process::Command;
use std::process::Stdio;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::Signal;
#[cfg(unix)]
use nix::sys::signal::killpg;
#[cfg(unix)]
use nix::unistd::Pid;
use sweep_core::ModuleName;
use sweep_core::VectorParams;
use sweep_core::WorkerError;
use sweep_core::WorkerHandle;
use sweep_core::WorkerReply;
use sweep_core::WorkerSpawner;

use crate::protocol::ProtocolError;
use crate::protocol::WorkerRequest;
use crate::protocol::read_message;
use crate::protocol::write_message;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Poll interval while waiting for a stopping worker to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// SECTION: Spawner
// ============================================================================

/// Command line used to start a worker; `--module <name>` is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerCommand {
    /// Worker executable.
    pub program: PathBuf,
    /// Arguments placed before `--module`.
    pub args: Vec<String>,
    /// Environment set on the worker process only.
    pub env: Vec<(String, String)>,
}

/// Starts workers as child processes.
#[derive(Debug, Clone)]
pub struct ProcessWorkerSpawner {
    /// Worker command line.
    command: WorkerCommand,
    /// Time a stopping worker gets before it is killed.
    shutdown_grace: Duration,
}

impl ProcessWorkerSpawner {
    /// Creates a spawner for the given worker command.
    #[must_use]
    pub const fn new(command: WorkerCommand, shutdown_grace: Duration) -> Self {
        Self {
            command,
            shutdown_grace,
        }
    }
}

impl WorkerSpawner for ProcessWorkerSpawner {
    fn spawn(&self, module: &ModuleName) -> Result<Box<dyn WorkerHandle>, WorkerError> {
        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .arg("--module")
            .arg(module.as_str())
            .envs(self.command.env.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        command.process_group(0);
        let child = command.spawn().map_err(|err| {
            WorkerError::Spawn(format!("{}: {err}", self.command.program.display()))
        })?;
        Ok(Box::new(ProcessWorker::attach(child, self.shutdown_grace)?))
    }
}

// ============================================================================
// SECTION: Worker Handle
// ============================================================================

/// A running worker process.
#[derive(Debug)]
pub struct ProcessWorker {
    /// Child process handle.
    child: Child,
    /// Request pipe; dropped to signal stop.
    stdin: Option<ChildStdin>,
    /// Decoded replies from the reader thread.
    replies: Receiver<Result<WorkerReply, String>>,
    /// Time a stopping worker gets before it is killed.
    shutdown_grace: Duration,
}

impl ProcessWorker {
    /// Takes ownership of a spawned child with piped stdin and stdout.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] when the pipes are missing.
    pub fn attach(mut child: Child, shutdown_grace: Duration) -> Result<Self, WorkerError> {
        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            return Err(WorkerError::Spawn("worker stdin not piped".to_string()));
        };
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(WorkerError::Spawn("worker stdout not piped".to_string()));
        };
        let (tx, replies) = mpsc::channel();
        thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                let message = match read_message::<WorkerReply>(&mut reader) {
                    Ok(reply) => Ok(reply),
                    Err(ProtocolError::Closed) => break,
                    Err(err) => Err(err.to_string()),
                };
                let failed = message.is_err();
                if tx.send(message).is_err() || failed {
                    break;
                }
            }
        });
        Ok(Self {
            child,
            stdin: Some(stdin),
            replies,
            shutdown_grace,
        })
    }

    /// Describes how the child exited, if it has.
    fn exit_description(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => format!("worker exited with {status}"),
            Ok(None) => "worker closed its output".to_string(),
            Err(err) => format!("worker status unavailable: {err}"),
        }
    }

    /// Kills the child with its process group and reaps it.
    fn kill_and_reap(&mut self) -> Result<(), WorkerError> {
        self.stdin.take();
        kill_process_group(&mut self.child)?;
        self.child.wait().map_err(|err| WorkerError::Io(format!("worker wait failed: {err}")))?;
        Ok(())
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.kill_and_reap();
        }
    }
}

/// Sends `SIGKILL` to the worker's process group, which holds its device host.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> Result<(), WorkerError> {
    let Ok(pid) = i32::try_from(child.id()) else {
        return kill_process(child);
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(_) => kill_process(child),
    }
}

/// Kills the worker process; there are no process groups to reach.
#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> Result<(), WorkerError> {
    kill_process(child)
}

/// Kills the worker process alone; an already exited child is not an error.
fn kill_process(child: &mut Child) -> Result<(), WorkerError> {
    match child.kill() {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::InvalidInput => Ok(()),
        Err(err) => Err(WorkerError::Io(format!("worker kill failed: {err}"))),
    }
}

impl WorkerHandle for ProcessWorker {
    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn submit(&mut self, params: &VectorParams) -> Result<(), WorkerError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| WorkerError::Io("worker input already closed".to_string()))?;
        let request = WorkerRequest::Execute {
            params: params.clone(),
        };
        write_message(stdin, &request).map_err(|err| match err {
            ProtocolError::Io(message) => WorkerError::Io(message),
            other => WorkerError::Protocol(other.to_string()),
        })
    }

    fn await_reply(&mut self, timeout: Duration) -> Result<WorkerReply, WorkerError> {
        match self.replies.recv_timeout(timeout) {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(message)) => Err(WorkerError::Protocol(message)),
            Err(RecvTimeoutError::Timeout) => Err(WorkerError::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(WorkerError::Exited(self.exit_description()))
            }
        }
    }

    fn terminate(mut self: Box<Self>) -> Result<(), WorkerError> {
        self.kill_and_reap()
    }

    fn stop(mut self: Box<Self>) -> Result<(), WorkerError> {
        self.stdin.take();
        let deadline = Instant::now() + self.shutdown_grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(WorkerError::Exited(format!("worker exited with {status}")));
                }
                Ok(None) => {}
                Err(err) => return Err(WorkerError::Io(format!("worker wait failed: {err}"))),
            }
            if Instant::now() >= deadline {
                self.kill_and_reap()?;
                return Err(WorkerError::Exited(format!(
                    "worker killed after {}ms shutdown grace",
                    self.shutdown_grace.as_millis()
                )));
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}
