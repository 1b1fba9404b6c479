// crates/sweep-runner/tests/process_session.rs
// ============================================================================
// Module: Process Session Tests
// Description: Real child processes standing in for workers.
// ============================================================================
//! ## Overview
//! Uses `sh` scripts as workers to exercise [`sweep_runner::ProcessWorker`]
//! timeouts, exits, graceful stops, and forced kills.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use sweep_core::ModuleName;
use sweep_core::VectorParams;
use sweep_core::WorkerError;
use sweep_core::WorkerHandle as _;
use sweep_core::WorkerSpawner;
use sweep_runner::ProcessWorkerSpawner;
use sweep_runner::WorkerCommand;

fn shell(script: &str, grace: Duration) -> ProcessWorkerSpawner {
    ProcessWorkerSpawner::new(
        WorkerCommand {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
            env: Vec::new(),
        },
        grace,
    )
}

fn module() -> ModuleName {
    ModuleName::from("eltwise.add")
}

/// Reads a pid written by a script, waiting for the file to appear.
fn read_pid(path: &Path) -> u32 {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(text) = fs::read_to_string(path)
            && let Ok(pid) = text.trim().parse()
        {
            return pid;
        }
        assert!(Instant::now() < deadline, "pid file never written");
        thread::sleep(Duration::from_millis(10));
    }
}

/// Returns true while the process exists and is not a zombie.
fn is_running(pid: u32) -> bool {
    let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    stat.rsplit_once(')')
        .is_some_and(|(_, rest)| !matches!(rest.trim_start().chars().next(), Some('Z' | 'X')))
}

/// Waits up to five seconds for a process to go away.
fn exits_soon(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !is_running(pid) {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn framed_reply_is_received_and_worker_stops_cleanly() {
    let script = r#"printf 'Content-Length: 30\r\n\r\n{"status":true,"message":"ok"}'; cat >/dev/null"#;
    let mut worker = shell(script, Duration::from_secs(5)).spawn(&module()).unwrap();
    assert!(worker.pid().is_some());

    worker.submit(&VectorParams::new()).unwrap();
    let reply = worker.await_reply(Duration::from_secs(5)).unwrap();

    assert!(reply.status);
    assert_eq!(reply.message, "ok");
    worker.stop().unwrap();
}

#[test]
fn silent_worker_times_out_and_is_killed() {
    let mut worker = shell("exec sleep 30", Duration::from_secs(5)).spawn(&module()).unwrap();
    worker.submit(&VectorParams::new()).unwrap();

    let started = Instant::now();
    let err = worker.await_reply(Duration::from_millis(200)).unwrap_err();

    assert!(matches!(err, WorkerError::TimedOut(_)));
    assert!(started.elapsed() < Duration::from_secs(10));
    worker.terminate().unwrap();
}

#[cfg(target_os = "linux")]
#[test]
fn terminating_a_wedged_worker_also_kills_its_device_host() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("host.pid");
    let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
    let mut worker = shell(&script, Duration::from_secs(5)).spawn(&module()).unwrap();
    let host = read_pid(&pid_file);
    worker.submit(&VectorParams::new()).unwrap();

    let err = worker.await_reply(Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, WorkerError::TimedOut(_)));
    assert!(is_running(host));
    worker.terminate().unwrap();

    assert!(exits_soon(host), "device host {host} outlived its worker");
}

#[cfg(target_os = "linux")]
#[test]
fn dropping_a_worker_kills_its_process_group() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("host.pid");
    let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
    let worker = shell(&script, Duration::from_secs(5)).spawn(&module()).unwrap();
    let host = read_pid(&pid_file);

    drop(worker);

    assert!(exits_soon(host), "device host {host} outlived its worker");
}

#[test]
fn exiting_worker_is_reported_as_exited() {
    let mut worker = shell("exit 3", Duration::from_secs(5)).spawn(&module()).unwrap();

    let err = worker.await_reply(Duration::from_secs(10)).unwrap_err();

    assert!(matches!(err, WorkerError::Exited(_)));
    worker.terminate().unwrap();
}

#[test]
fn garbage_output_is_a_protocol_error() {
    let script = "printf 'hello there\\r\\n\\r\\n'; cat >/dev/null";
    let mut worker = shell(script, Duration::from_secs(5)).spawn(&module()).unwrap();

    let err = worker.await_reply(Duration::from_secs(10)).unwrap_err();

    assert!(matches!(err, WorkerError::Protocol(_)));
    worker.terminate().unwrap();
}

#[test]
fn worker_ignoring_stop_is_killed_after_grace() {
    let mut worker = shell("exec sleep 30", Duration::from_millis(100)).spawn(&module()).unwrap();
    worker.submit(&VectorParams::new()).unwrap();

    let started = Instant::now();
    let err = worker.stop().unwrap_err();

    assert!(matches!(err, WorkerError::Exited(message) if message.contains("100ms")));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn missing_worker_binary_is_a_spawn_error() {
    let spawner = ProcessWorkerSpawner::new(
        WorkerCommand {
            program: PathBuf::from("/nonexistent/sweep-worker"),
            ..WorkerCommand::default()
        },
        Duration::from_secs(1),
    );

    let err = spawner.spawn(&module()).err().unwrap();

    assert!(matches!(err, WorkerError::Spawn(_)));
}
